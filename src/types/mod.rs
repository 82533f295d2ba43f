pub mod location;
pub mod measurement;
pub mod outcome;
pub mod time_chunk;
