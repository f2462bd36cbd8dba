use anyhow::Result;

use hakwonplus::config::Config;
use hakwonplus::jobs::{poll_until_done, JobEndpoint, PollPolicy};

use super::open_context;

pub async fn job(config: Config, job_id: &str, endpoint: JobEndpoint) -> Result<()> {
    let ctx = open_context(config)?;
    let source = ctx.client().jobs().source(endpoint);
    let policy = PollPolicy::default();

    println!("Waiting for {} job {job_id}", endpoint.job_type());
    let snapshot = poll_until_done(source.as_ref(), job_id, &policy, |snapshot| {
        match snapshot.percent() {
            Some(percent) => println!("  {} {percent:.0}%", snapshot.status.as_str()),
            None => println!("  {}", snapshot.status.as_str()),
        }
    })
    .await?;

    println!("Done");
    if let Some(result) = &snapshot.result {
        println!("{}", serde_json::to_string_pretty(result)?);
    }
    Ok(())
}
