pub mod announcement_flow;

pub use announcement_flow::{render_content, AnnouncementFlow, ProcessResult};
