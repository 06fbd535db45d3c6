//! Reading replies from the user

use log::debug;
use shared::protocol::InputSpec;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::error::ClientError;
use crate::rendering::Renderer;

/// Line reader that keeps asking until a reply satisfies the server's input
/// specification, so the server only ever sees valid replies.
pub struct InputManager<R> {
    reader: R,
    line: String,
}

impl<R: AsyncBufRead + Unpin> InputManager<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
        }
    }

    /// Prompts and reads until a line passes `input`. Fails with
    /// [`ClientError::InputClosed`] at end of input.
    pub async fn read_reply<W: Write>(
        &mut self,
        input: &InputSpec,
        renderer: &mut Renderer<W>,
    ) -> Result<String, ClientError> {
        loop {
            renderer.prompt(input)?;

            self.line.clear();
            if self.reader.read_line(&mut self.line).await? == 0 {
                return Err(ClientError::InputClosed);
            }
            let reply = self.line.trim_end_matches(['\r', '\n']);

            match input.validate(reply) {
                Ok(()) => return Ok(reply.to_string()),
                Err(e) => {
                    debug!("Rejected reply {:?}: {}", reply, e);
                    renderer.rejected(&e)?;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_retries_until_valid() {
        let typed: &[u8] = b"7\nx\n2\n";
        let mut input = InputManager::new(typed);
        let mut renderer = Renderer::new(Vec::new());

        let reply = input
            .read_reply(&InputSpec::numbered(3), &mut renderer)
            .await
            .unwrap();
        assert_eq!(reply, "2");

        let shown = String::from_utf8(renderer.into_inner()).unwrap();
        assert_eq!(shown.matches("Error: Invalid selection.").count(), 2);
        assert_eq!(shown.matches("> Choose one (1, 2, 3): ").count(), 3);
    }

    #[tokio::test]
    async fn test_text_limits() {
        let typed = "héllo\ntoolongname\nbob\r\n".as_bytes();
        let mut input = InputManager::new(typed);
        let mut renderer = Renderer::new(Vec::new());

        let reply = input
            .read_reply(&InputSpec::text(5), &mut renderer)
            .await
            .unwrap();
        assert_eq!(reply, "bob");

        let shown = String::from_utf8(renderer.into_inner()).unwrap();
        assert!(shown.contains("Error: ASCII only."));
        assert!(shown.contains("Error: Max length is 5."));
    }

    #[tokio::test]
    async fn test_empty_text_is_a_reply() {
        let typed: &[u8] = b"\n";
        let mut input = InputManager::new(typed);
        let mut renderer = Renderer::new(Vec::new());

        let reply = input
            .read_reply(&InputSpec::text(5), &mut renderer)
            .await
            .unwrap();
        assert_eq!(reply, "");
    }

    #[tokio::test]
    async fn test_end_of_input() {
        let typed: &[u8] = b"9\n";
        let mut input = InputManager::new(typed);
        let mut renderer = Renderer::new(Vec::new());

        let result = input.read_reply(&InputSpec::numbered(2), &mut renderer).await;
        assert!(matches!(result, Err(ClientError::InputClosed)));
    }
}
