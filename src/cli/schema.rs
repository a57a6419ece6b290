use schemars::schema_for;

use crate::cli::{SchemaArgs, SchemaTarget};
use crate::config::Config;
use crate::output::FinalReport;
use crate::schema::Job;

pub fn execute(args: SchemaArgs) -> anyhow::Result<()> {
    let schema = match args.target {
        SchemaTarget::Config => schema_for!(Config),
        SchemaTarget::Job => schema_for!(Job),
        SchemaTarget::Report => schema_for!(FinalReport),
    };
    let json = serde_json::to_string_pretty(&schema)?;
    println!("{}", json);
    Ok(())
}
