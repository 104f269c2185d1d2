pub mod block_rule;
pub mod payload;
pub mod screen_state;
pub mod selectors;
pub mod signer;
pub mod work_item;

pub use block_rule::BlockRule;
pub use payload::ObservationPayload;
pub use screen_state::ScreenState;
pub use signer::resolve_signer;
pub use work_item::WorkItem;
