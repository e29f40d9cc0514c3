// Assessment core: category classification, question resolution, completion scoring
// and the response save/sync path.

pub mod cache;
pub mod catalog;
pub mod classifier;
pub mod completion;
pub mod handlers;
pub mod progress;
pub mod resolver;
pub mod store;
pub mod sync;
