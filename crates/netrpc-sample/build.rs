use anyhow::Context;

fn main() -> anyhow::Result<()> {
    netrpc_build::compile().context("generating rpc bindings")?;
    Ok(())
}
