pub mod conversation;
pub mod files;
pub mod models;
pub mod session;
pub mod stream;

pub use conversation::ConversationLog;
pub use files::FileRegistry;
pub use models::{FileRecord, Message, Role};
pub use session::{
    Activity, BootstrapReport, DeleteOutcome, Notice, NoticeKind, SendOutcome, SessionController,
    SessionEvent, SessionSnapshot,
};
pub use stream::{StreamAccumulator, StreamState};
