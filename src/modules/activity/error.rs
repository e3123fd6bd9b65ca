use poise::serenity_prelude as serenity;

/// Failures the activity commands and event handlers need to tell apart.
#[derive(Debug, thiserror::Error)]
pub enum ActivityError {
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("discord request failed: {0}")]
    Gateway(#[from] serenity::Error),

    #[error("write queue closed: {0}")]
    WriteQueueClosed(#[from] tokio::sync::AcquireError),

    #[error("background write task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type ActivityResult<T> = Result<T, ActivityError>;
