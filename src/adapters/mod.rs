pub mod codecs;
pub mod local;

pub use local::LocalStorage;
