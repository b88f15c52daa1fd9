use anyhow::Result;

pub mod report;

pub use report::ReportCommand;

#[allow(async_fn_in_trait)]
pub trait Command {
    async fn execute(&self) -> Result<()>;
}
