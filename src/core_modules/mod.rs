pub mod channel_codec;
pub mod layers;
pub mod sampler;
pub mod summarizer;
pub mod tags;
