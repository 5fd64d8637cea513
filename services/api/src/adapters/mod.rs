pub mod analysis_llm;
pub mod db;
pub mod notifications;

pub use analysis_llm::OpenAiAnalysisAdapter;
pub use db::DbAdapter;
pub use notifications::PgNotificationQueue;
