pub mod blockmap;
pub mod cache;
pub mod cfg;
pub mod dominators;
pub mod error;
pub mod loops;
pub mod phi;
pub mod rpo;
pub mod validate;

pub use blockmap::BasicBlockMap;
pub use cache::AnalysisCache;
pub use cfg::Cfg;
pub use dominators::DominatorTree;
pub use error::AnalysisError;
pub use loops::{find_loops, Loop, LoopNest};
pub use phi::{all_phis, phis_in_block};
pub use rpo::{is_reachable, reverse_post_order, reverse_post_order_excluding};
pub use validate::{verify, verify_no_view_types};
