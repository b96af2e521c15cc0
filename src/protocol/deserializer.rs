use async_trait::async_trait;
use tokio::io::AsyncReadExt;

use super::message::{Message, Mode};

#[async_trait]
pub trait Deserialize: Sized {
    type Error;

    // Deserialize a structure from a reader
    async fn deserialize<R: AsyncReadExt + Unpin + Send>(
        reader: &mut R,
    ) -> Result<Self, Self::Error>;
}

#[derive(thiserror::Error, Debug)]
pub enum DeserializeError {
    #[error("{0}")]
    Io(#[from] tokio::io::Error),

    #[error("Not a mode message: 0x{0:02X}")]
    NotAMode(u8),
}

#[async_trait]
impl Deserialize for Message {
    type Error = DeserializeError;

    async fn deserialize<R: AsyncReadExt + Unpin + Send>(
        reader: &mut R,
    ) -> Result<Self, <Self as Deserialize>::Error> {
        // every message is exactly one byte, a short read means the connection is gone
        let byte = reader.read_u8().await?;

        Ok(Message::decode(byte))
    }
}

#[async_trait]
impl Deserialize for Mode {
    type Error = DeserializeError;

    async fn deserialize<R: AsyncReadExt + Unpin + Send>(
        reader: &mut R,
    ) -> Result<Self, Self::Error> {
        let byte = reader.read_u8().await?;

        Mode::decode(byte).ok_or(DeserializeError::NotAMode(byte))
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        id::BuzzerId,
        protocol::{
            deserializer::{Deserialize, DeserializeError},
            message::{Message, Mode},
        },
    };

    #[tokio::test]
    async fn deserialize_handshake() {
        let mut raw: &[u8] = b"\x04\x85\x31\x30\x7f\x22";

        let mut messages = Vec::new();
        for _ in 0..6 {
            messages.push(Message::deserialize(&mut raw).await.unwrap());
        }

        assert_eq!(
            messages,
            [
                Message::Version(4),
                Message::Identify(BuzzerId::from_raw(5)),
                Message::Heartbeat,
                Message::ButtonPress,
                Message::Error,
                Message::Unknown(0x22),
            ]
        );

        // nothing left to read
        assert!(matches!(
            Message::deserialize(&mut raw).await,
            Err(DeserializeError::Io(_))
        ));
    }

    #[tokio::test]
    async fn deserialize_modes() {
        let mut raw: &[u8] = b"\x21\x23\x31";

        assert_eq!(Mode::deserialize(&mut raw).await.unwrap(), Mode::LED);
        assert_eq!(Mode::deserialize(&mut raw).await.unwrap(), Mode::ON);
        assert!(matches!(
            Mode::deserialize(&mut raw).await,
            Err(DeserializeError::NotAMode(0x31))
        ));
    }
}
