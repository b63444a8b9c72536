use std::time::Duration;

use anyhow::{Context, Result};
use rmcp::{transport::stdio, ServiceExt};
use tokio::runtime::Builder;

use crate::{
    cli::{Cli, Command},
    server::TelegramTools,
    usecases::{
        bootstrap,
        context::AppContext,
        get_me::get_me,
        list_dialogs::{list_dialogs, ListDialogsQuery},
    },
};

const SERVER_STARTED: &str = "SERVER_STARTED";
const SERVER_STOPPED: &str = "SERVER_STOPPED";
const SERVER_TERMINATION_REQUESTED: &str = "SERVER_TERMINATION_REQUESTED";
const SIGNAL_LISTENER_FAILED: &str = "SIGNAL_LISTENER_FAILED";
const DRY_RUN_CHECK_PASSED: &str = "DRY_RUN_CHECK_PASSED";
/// The stdin reader sits on the blocking pool and never finishes on its own.
const BLOCKING_POOL_GRACE: Duration = Duration::from_secs(2);

pub fn run(cli: Cli) -> Result<()> {
    match cli.command_or_default() {
        Command::Serve { dry } => {
            let context = bootstrap::bootstrap(cli.config.as_deref())?;

            if dry {
                dry_run(&context)
            } else {
                serve(&context)
            }
        }
    }
}

fn serve(context: &AppContext) -> Result<()> {
    tracing::info!(
        code = SERVER_STARTED,
        gateway_url = %context.config.telegram.gateway_url,
        "serving tools on stdio"
    );

    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start server runtime")?;
    let tools = TelegramTools::new(context.gateway.clone());
    let shutdown = context.shutdown.clone();

    let served = runtime.block_on(async move {
        let service = tools.serve(stdio()).await.context("MCP handshake failed")?;

        tokio::select! {
            quit = service.waiting() => {
                let reason = quit.context("MCP service task failed")?;
                tracing::info!(code = SERVER_STOPPED, reason = ?reason, "client went away");
            }
            () = shutdown.cancel_on(termination_signal()) => {
                tracing::info!(
                    code = SERVER_TERMINATION_REQUESTED,
                    "termination requested, upstream calls cancelled"
                );
            }
        }

        Ok::<(), anyhow::Error>(())
    });

    // Unblocks any worker still waiting on the gateway before the runtime
    // joins its blocking pool.
    context.shutdown.shutdown();
    runtime.shutdown_timeout(BLOCKING_POOL_GRACE);
    served
}

/// Resolves on Ctrl-C. Never resolves if the listener cannot be installed.
async fn termination_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(
            code = SIGNAL_LISTENER_FAILED,
            error = %error,
            "cannot listen for ctrl-c"
        );
        std::future::pending::<()>().await;
    }
}

/// Exercises the read-only tools once and logs their answers.
fn dry_run(context: &AppContext) -> Result<()> {
    let me = get_me(context.gateway.as_ref()).context("get user")?;
    tracing::info!(
        code = DRY_RUN_CHECK_PASSED,
        answer = %serde_json::to_string(&me)?,
        "check tg_me: ok"
    );

    let dialogs = list_dialogs(
        context.gateway.as_ref(),
        ListDialogsQuery {
            offset: String::new(),
            only_unread: true,
        },
    )
    .context("get dialogs")?;
    tracing::info!(
        code = DRY_RUN_CHECK_PASSED,
        answer = %serde_json::to_string(&dialogs)?,
        "check tg_dialogs: ok"
    );

    Ok(())
}
