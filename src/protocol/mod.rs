pub mod deserializer;
pub mod message;
pub mod serializer;

pub use deserializer::{Deserialize, DeserializeError};
pub use message::{Message, Mode};
pub use serializer::{Serialize, SerializeError};
