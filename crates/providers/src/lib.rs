pub mod openai;
pub mod poll;
pub mod traits;
pub mod util;

// Re-exports for convenience.
pub use openai::OpenAiAssistantsClient;
pub use poll::{upload_and_poll, wait_for_run, RunWait};
pub use traits::{
    Assistant, AssistantProvider, AssistantTool, BatchStatus, CreateAssistant, FileBatch,
    FileCounts, FileObject, FileSearchResources, MessageObject, NewMessage, Run, RunError,
    RunStatus, Thread, ToolResources, UpdateAssistant, UploadFile, VectorStore,
};
