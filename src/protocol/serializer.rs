use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use super::message::{Message, Mode};

#[async_trait]
pub trait Serialize: Sized {
    type Error;

    /// Serialize a structure into a writer
    async fn serialize<W: AsyncWriteExt + Unpin + Send>(
        &self,
        writer: &mut W,
    ) -> Result<(), Self::Error>;
}

#[derive(thiserror::Error, Debug)]
pub enum SerializeError {
    #[error("{0}")]
    Io(#[from] tokio::io::Error),
}

#[async_trait]
impl Serialize for Mode {
    type Error = SerializeError;

    async fn serialize<W: AsyncWriteExt + Unpin + Send>(
        &self,
        writer: &mut W,
    ) -> Result<(), Self::Error> {
        writer.write_u8(self.encode()).await?;

        Ok(())
    }
}

// only buzzers send these, the fake buzzer uses it to talk to the station
#[async_trait]
impl Serialize for Message {
    type Error = SerializeError;

    async fn serialize<W: AsyncWriteExt + Unpin + Send>(
        &self,
        writer: &mut W,
    ) -> Result<(), <Self as Serialize>::Error> {
        writer.write_u8(self.encode()).await?;

        Ok(())
    }
}
