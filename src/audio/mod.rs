pub mod encoder;
pub mod frame;
pub mod mixer;

pub use encoder::{ChunkedEncoder, EncodedChunk, EncoderConfig, RecordingBlob};
pub use frame::{AudioFrame, StreamSource};
pub use mixer::{MixerConfig, StreamMixer};
