mod config;
mod console;

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{FixedOffset, NaiveDate};
use clap::{Parser, Subcommand};
use client_core::{
    AlwaysConfirm, BackendOptions, BoardEvent, ClientError, Confirm, ErrorCategory,
    FilterCriteria, FulfillmentFilter, HttpOrderBackend, NoticeKind, OrderBackend, OrderBoard,
    Pagination, StatusFilter, TokenStore, TransitionError,
};
use shared::domain::{OrderId, StatusAction, StretchData};
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::{config::Settings, console::StdinConfirm};

#[derive(Parser, Debug)]
#[command(name = "admin", about = "Order administration console")]
struct Args {
    /// Backend base url; overrides admin.toml and the environment.
    #[arg(long, global = true)]
    server_url: Option<String>,
    /// Bearer token for this invocation only.
    #[arg(long, global = true)]
    token: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(subcommand)]
    Orders(OrdersCommand),
    /// Order counts per status.
    Summary,
    #[command(subcommand)]
    Sales(SalesCommand),
    #[command(subcommand)]
    Token(TokenCommand),
}

#[derive(Subcommand, Debug)]
enum OrdersCommand {
    List(ListArgs),
    Show { id: String },
    Dispatch(ActionArgs),
    Fulfill(ActionArgs),
    Cancel(ActionArgs),
    Delete(ActionArgs),
    /// Set tailoring measurements, e.g. `--set kameez.chest=38 --set height=5'6`.
    Measure(MeasureArgs),
}

#[derive(clap::Args, Debug)]
struct ListArgs {
    #[arg(long, default_value = "All")]
    status: StatusFilter,
    #[arg(long, default_value = "All")]
    fulfillment: FulfillmentFilter,
    /// Substring of the order id.
    #[arg(long, default_value = "")]
    search: String,
    /// Calendar day (YYYY-MM-DD) in the display offset.
    #[arg(long)]
    date: Option<NaiveDate>,
    /// 1-based page number.
    #[arg(long, default_value_t = 1)]
    page: usize,
    #[arg(long)]
    page_size: Option<usize>,
}

#[derive(clap::Args, Debug)]
struct ActionArgs {
    id: String,
    /// Skip the confirmation prompt.
    #[arg(long, short)]
    yes: bool,
}

#[derive(clap::Args, Debug)]
struct MeasureArgs {
    id: String,
    /// `section.field=value` or `height=value`/`weight=value`; repeatable.
    #[arg(long = "set", value_name = "KEY=VALUE", required = true)]
    set: Vec<String>,
}

#[derive(Subcommand, Debug)]
enum SalesCommand {
    /// Revenue across fulfilled orders.
    Fulfilled,
    /// Revenue for one calendar day.
    On { date: NaiveDate },
}

#[derive(Subcommand, Debug)]
enum TokenCommand {
    Set { token: String },
    Clear,
    Verify,
}

struct Console {
    board: OrderBoard,
    events: broadcast::Receiver<BoardEvent>,
    tokens: TokenStore,
    offset: FixedOffset,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let settings = config::load_settings()?;
    let server_url = args
        .server_url
        .clone()
        .unwrap_or_else(|| settings.server_url.clone());
    let tokens = TokenStore::new(&settings.token_path);

    let command = match args.command {
        Command::Token(command) => {
            return run_token(command, &server_url, args.token, &settings, &tokens).await;
        }
        other => other,
    };

    let token = resolve_token(args.token, &settings, &tokens)?;
    let backend = connect(&server_url, token, &settings)?;
    let board = OrderBoard::new(backend)
        .with_criteria(FilterCriteria::default().with_offset(settings.day_offset()))
        .with_pagination(Pagination::new(settings.page_size));
    let events = board.subscribe_events();
    let mut console = Console {
        board,
        events,
        tokens,
        offset: settings.day_offset(),
    };

    let result = match command {
        Command::Orders(command) => console.run_orders(command).await,
        Command::Summary => console.summary().await,
        Command::Sales(command) => console.sales(command).await,
        Command::Token(_) => Ok(()),
    };
    console.drain_events()?;
    result
}

fn connect(
    server_url: &str,
    token: Option<String>,
    settings: &Settings,
) -> Result<Arc<dyn OrderBackend>> {
    let options = BackendOptions::new(server_url)
        .with_token(token)
        .with_timeout(settings.request_timeout());
    let backend = HttpOrderBackend::new(options)
        .with_context(|| format!("failed to set up backend client for '{server_url}'"))?;
    info!(url = %backend.base_url(), "using order backend");
    Ok(Arc::new(backend))
}

/// `--token`, then `ADMIN_TOKEN`, then the stored token.
fn resolve_token(
    flag: Option<String>,
    settings: &Settings,
    tokens: &TokenStore,
) -> Result<Option<String>> {
    if let Some(token) = flag.or_else(|| settings.token.clone()) {
        return Ok(Some(token));
    }
    tokens.load()
}

fn confirmer(assume_yes: bool) -> Box<dyn Confirm> {
    if assume_yes {
        Box::new(AlwaysConfirm)
    } else {
        Box::new(StdinConfirm)
    }
}

/// Applies `KEY=VALUE` pairs on top of the measurements already on file.
fn apply_measurements(mut measurements: StretchData, pairs: &[String]) -> Result<StretchData> {
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .with_context(|| format!("expected KEY=VALUE, got '{pair}'"))?;
        measurements.set(key.trim(), value)?;
    }
    Ok(measurements)
}

fn forget_token(tokens: &TokenStore) -> Result<()> {
    warn!("session expired; stored token cleared");
    tokens.clear()?;
    eprintln!("session expired, run `admin token set <TOKEN>` to sign in again");
    Ok(())
}

async fn run_token(
    command: TokenCommand,
    server_url: &str,
    flag: Option<String>,
    settings: &Settings,
    tokens: &TokenStore,
) -> Result<()> {
    match command {
        TokenCommand::Set { token } => {
            tokens.save(&token)?;
            println!("token stored at {}", tokens.path().display());
        }
        TokenCommand::Clear => {
            tokens.clear()?;
            println!("token cleared");
        }
        TokenCommand::Verify => {
            let token = resolve_token(flag, settings, tokens)?;
            if token.is_none() {
                println!("no token configured");
                return Ok(());
            }
            let backend = connect(server_url, token, settings)?;
            if backend.verify_token().await? {
                println!("token accepted");
            } else {
                forget_token(tokens)?;
            }
        }
    }
    Ok(())
}

impl Console {
    async fn run_orders(&mut self, command: OrdersCommand) -> Result<()> {
        match command {
            OrdersCommand::List(list) => self.list(list).await,
            OrdersCommand::Show { id } => {
                let order = self
                    .board
                    .order_detail(&OrderId::from(id))
                    .await
                    .map_err(|err| self.fetch_failed(err))?;
                print!("{}", console::render_order(&order, &self.offset));
                Ok(())
            }
            OrdersCommand::Dispatch(action) => self.act(action, StatusAction::Dispatch).await,
            OrdersCommand::Fulfill(action) => self.act(action, StatusAction::Fulfill).await,
            OrdersCommand::Cancel(action) => self.act(action, StatusAction::Cancel).await,
            OrdersCommand::Delete(action) => self.delete(action).await,
            OrdersCommand::Measure(measure) => self.measure(measure).await,
        }
    }

    async fn list(&mut self, list: ListArgs) -> Result<()> {
        self.board.load().await?;
        self.board.set_criteria(FilterCriteria {
            status: list.status,
            fulfillment: list.fulfillment,
            search_text: list.search,
            date: list.date,
            offset: self.offset,
        });
        if let Some(size) = list.page_size {
            self.board.set_page_size(size);
        }
        self.board.set_page(list.page.saturating_sub(1));

        let view = self.board.page_view();
        let rendered = console::render_page(&view, &self.offset, |order| {
            self.board
                .availability(&order.order_id)
                .unwrap_or_else(|| order.availability())
        });
        print!("{rendered}");
        Ok(())
    }

    async fn act(&mut self, args: ActionArgs, action: StatusAction) -> Result<()> {
        self.board.load().await?;
        let order_id = OrderId::from(args.id);
        let mut confirm = confirmer(args.yes);
        match self
            .board
            .apply_action(&order_id, action, confirm.as_mut())
            .await
        {
            Ok(status) => {
                println!("order {order_id} is now {status}");
                Ok(())
            }
            Err(TransitionError::Declined) => {
                println!("aborted");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn delete(&mut self, args: ActionArgs) -> Result<()> {
        self.board.load().await?;
        let order_id = OrderId::from(args.id);
        let mut confirm = confirmer(args.yes);
        match self.board.delete(&order_id, confirm.as_mut()).await {
            Ok(_) => {
                println!("order {order_id} deleted");
                Ok(())
            }
            Err(TransitionError::Declined) => {
                println!("aborted");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn measure(&mut self, args: MeasureArgs) -> Result<()> {
        let order = self
            .board
            .order_detail(&OrderId::from(args.id))
            .await
            .map_err(|err| self.fetch_failed(err))?;
        let measurements = apply_measurements(order.stretch_data.unwrap_or_default(), &args.set)?;
        self.board
            .update_measurements(&order.order_id, measurements)
            .await?;
        println!("measurements saved for order {}", order.order_id);
        Ok(())
    }

    async fn summary(&mut self) -> Result<()> {
        self.board.load().await?;
        print!("{}", console::render_summary(&self.board.summary()));
        Ok(())
    }

    async fn sales(&mut self, command: SalesCommand) -> Result<()> {
        let total = match command {
            SalesCommand::Fulfilled => self.board.total_fulfilled_sales().await,
            SalesCommand::On { date } => self.board.total_sales_on(date).await,
        }
        .map_err(|err| self.fetch_failed(err))?;
        println!("{total:.2}");
        Ok(())
    }

    /// Direct backend reads bypass the board, so auth failures are checked
    /// here instead of arriving as events.
    fn fetch_failed(&self, err: ClientError) -> anyhow::Error {
        if err.category(false) == ErrorCategory::Auth {
            if let Err(clear_err) = forget_token(&self.tokens) {
                warn!(error = %clear_err, "failed to clear stored token");
            }
        }
        err.into()
    }

    fn drain_events(&mut self) -> Result<()> {
        while let Ok(event) = self.events.try_recv() {
            match event {
                BoardEvent::SessionExpired => forget_token(&self.tokens)?,
                BoardEvent::Notice {
                    kind: NoticeKind::Error(category),
                    message,
                } => warn!(?category, "{message}"),
                BoardEvent::Notice { message, .. } => info!("{message}"),
                BoardEvent::LoadFailed { message, category } => {
                    warn!(%message, ?category, "order list unavailable")
                }
                _ => {}
            }
        }
        Ok(())
    }
}
