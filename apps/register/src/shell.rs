//! # Register Shell
//!
//! Line-oriented front end over the commands. Reads stdin, runs one
//! command per line and prints the result.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  stdin line ──► tokenize ──► ShellLine (clap) ──► Shell::execute       │
//! │                                                        │                │
//! │                              commands::* (DbState, SessionState, ...)  │
//! │                                                        │                │
//! │  stdout ◄── cart / receipt text, or JSON for everything else           │
//! │                                                                         │
//! │  Between lines: new low-stock alerts from the monitor are announced    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use apotheca_core::ProductDraft;
use chrono::Utc;
use clap::Parser;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info};

use crate::cli::{tokenize, ShellCommand, ShellLine};
use crate::commands::cart::SessionView;
use crate::commands::product::ProductDto;
use crate::commands::{auth, cart, checkout, formula, product, report, settings, user};
use crate::error::{ApiError, ApiResult};
use crate::state::{ConfigState, DbState, LowStockAlert, LowStockHandle, SessionState};

/// Outcome of one shell line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Quit,
}

/// The interactive register.
pub struct Shell {
    db: DbState,
    session: SessionState,
    config: ConfigState,
    alerts: Option<LowStockHandle>,
}

impl Shell {
    pub fn new(db: DbState, config: ConfigState, alerts: Option<LowStockHandle>) -> Self {
        Shell {
            db,
            session: SessionState::new(),
            config,
            alerts,
        }
    }

    /// Runs until `quit` or end of input.
    pub async fn run(self) -> std::io::Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();
        let mut alert_rx = self.alerts.as_ref().map(LowStockHandle::subscribe);

        let banner = format!(
            "{} register. Type `help` for commands, `login <user> <password>` to start.\n",
            self.config.store_name
        );
        stdout.write_all(banner.as_bytes()).await?;

        loop {
            stdout.write_all(self.prompt().await.as_bytes()).await?;
            stdout.flush().await?;

            let Some(line) = lines.next_line().await? else {
                break;
            };

            match self.execute_line(&line).await {
                Reply::Quit => break,
                Reply::Text(text) if text.is_empty() => {}
                Reply::Text(text) => {
                    stdout.write_all(text.as_bytes()).await?;
                    stdout.write_all(b"\n").await?;
                }
            }

            if let Some(rx) = alert_rx.as_mut() {
                if rx.has_changed().unwrap_or(false) {
                    let alerts = rx.borrow_and_update().clone();
                    if !alerts.is_empty() {
                        let note = format!(
                            "! {} product(s) low on stock, type `alerts` to list\n",
                            alerts.len()
                        );
                        stdout.write_all(note.as_bytes()).await?;
                    }
                }
            }
        }

        if self.session.lock().await.user().is_some() {
            let _ = auth::logout(&self.db, &self.session).await;
        }
        if let Some(handle) = &self.alerts {
            handle.shutdown().await;
        }
        info!("Shell closed");
        Ok(())
    }

    async fn prompt(&self) -> String {
        let session = self.session.lock().await;
        match session.user() {
            Some(user) => format!(
                "[{}] cart {}/{} > ",
                user.username,
                session.carts.active_index() + 1,
                session.carts.cart_count()
            ),
            None => "(logged out) > ".to_string(),
        }
    }

    /// Parses and runs one line.
    pub async fn execute_line(&self, line: &str) -> Reply {
        let tokens = match tokenize(line) {
            Ok(tokens) => tokens,
            Err(e) => return Reply::Text(format!("error: {}", e)),
        };
        if tokens.is_empty() {
            return Reply::Text(String::new());
        }

        let command = match ShellLine::try_parse_from(tokens) {
            Ok(parsed) => parsed.command,
            Err(e) => return Reply::Text(e.to_string().trim_end().to_string()),
        };
        if matches!(command, ShellCommand::Quit) {
            return Reply::Quit;
        }

        match self.execute(command).await {
            Ok(text) => Reply::Text(text),
            Err(e) => {
                debug!(code = ?e.code, "Command failed");
                Reply::Text(format!("error {}", e))
            }
        }
    }

    async fn execute(&self, command: ShellCommand) -> ApiResult<String> {
        let db = &self.db;
        let session = &self.session;
        let config = &self.config;

        match command {
            ShellCommand::Login { username, password } => {
                let user = auth::login(db, session, &username, &password).await?;
                Ok(format!("Welcome, {} ({})", user.full_name, user.role))
            }
            ShellCommand::Logout => {
                auth::logout(db, session).await?;
                Ok("Logged out".to_string())
            }
            ShellCommand::Whoami => match auth::whoami(session).await {
                Some(user) => json(&user),
                None => Ok("Nobody is logged in".to_string()),
            },

            ShellCommand::Search { query } => {
                let hits = product::search_products(db, &query.join(" "), None).await?;
                Ok(render_products(&hits, config))
            }
            ShellCommand::Scan { barcode } => self.show(cart::scan(db, session, &barcode).await?),
            ShellCommand::Add { product_id } => {
                self.show(cart::add_to_cart(db, session, &product_id).await?)
            }
            ShellCommand::Quantity {
                product_id,
                quantity,
            } => self.show(cart::set_quantity(session, &product_id, quantity).await?),
            ShellCommand::Remove { product_id } => {
                self.show(cart::remove_from_cart(session, &product_id).await?)
            }
            ShellCommand::Clear => self.show(cart::clear_cart(session).await?),
            ShellCommand::Cart => self.show(cart::get_session(session).await),
            ShellCommand::NewCart => self.show(cart::new_cart(session).await?),
            ShellCommand::Switch { number } => {
                self.show(cart::switch_cart(session, number.saturating_sub(1)).await?)
            }
            ShellCommand::DeleteCart { number } => {
                self.show(cart::delete_cart(session, number.saturating_sub(1)).await?)
            }
            ShellCommand::Discount { rate } => self.show(cart::set_discount(session, &rate).await?),

            ShellCommand::Checkout => {
                let response = checkout::checkout(db, session, config).await?;
                Ok(response.text)
            }
            ShellCommand::Reprint { receipt_number } => {
                let response =
                    checkout::reprint_receipt(db, session, config, &receipt_number).await?;
                Ok(response.text)
            }
            ShellCommand::Orders { limit } => json(&checkout::recent_orders(db, session, limit).await?),

            ShellCommand::Product { id } => json(&product::get_product(db, &id).await?),
            ShellCommand::Substitutes { id } => {
                let products = product::substitutes(db, &id).await?;
                Ok(render_products(&products, config))
            }
            ShellCommand::Category { category } => {
                let products = product::list_by_category(db, category).await?;
                Ok(render_products(&products, config))
            }
            ShellCommand::LowStock { threshold } => {
                let products = product::low_stock(db, threshold).await?;
                Ok(render_products(&products, config))
            }
            ShellCommand::Alerts => {
                let alerts = self
                    .alerts
                    .as_ref()
                    .map(LowStockHandle::current)
                    .unwrap_or_default();
                Ok(render_alerts(&alerts))
            }

            ShellCommand::AddProduct {
                name,
                price,
                cost,
                stock,
                barcode,
                category,
                formula,
                description,
            } => {
                let draft = ProductDraft {
                    name,
                    barcode,
                    category,
                    quantity: stock,
                    purchase_price_cents: cost,
                    sale_price_cents: price,
                    description,
                    formula_id: formula,
                };
                json(&product::create_product(db, session, draft).await?)
            }
            ShellCommand::Restock { product_id, delta } => {
                json(&product::adjust_stock(db, session, &product_id, delta).await?)
            }
            ShellCommand::DeleteProduct { id } => {
                product::delete_product(db, session, &id).await?;
                Ok("Product deleted".to_string())
            }

            ShellCommand::Formulas => json(&formula::list_formulas(db).await?),
            ShellCommand::AddFormula { name, description } => {
                json(&formula::create_formula(db, session, &name, description.as_deref()).await?)
            }
            ShellCommand::DeleteFormula { id } => {
                formula::delete_formula(db, session, &id).await?;
                Ok("Formula deleted".to_string())
            }

            ShellCommand::Users => json(&user::list_users(db, session).await?),
            ShellCommand::AddUser {
                username,
                password,
                role,
                full_name,
            } => json(
                &user::create_user(db, session, &username, &full_name, &password, role.into())
                    .await?,
            ),
            ShellCommand::DeleteUser { id } => {
                user::delete_user(db, session, &id).await?;
                Ok("User deleted".to_string())
            }
            ShellCommand::Passwd { new_password, user } => {
                user::change_password(db, session, user.as_deref(), &new_password).await?;
                Ok("Password changed".to_string())
            }

            ShellCommand::Report { from, to, top } => {
                let from = from.unwrap_or_else(|| Utc::now().date_naive());
                let to = to.unwrap_or(from);
                json(&report::sales_report(db, session, from, to, top).await?)
            }

            ShellCommand::Settings => json(&settings::get_settings(db).await?),
            ShellCommand::SetStore {
                name,
                address,
                phone,
                auto_print,
                threshold,
            } => {
                let mut current = settings::get_settings(db).await?;
                if let Some(name) = name {
                    current.store_name = name;
                }
                if let Some(address) = address {
                    current.store_address = address;
                }
                if let Some(phone) = phone {
                    current.store_phone = phone;
                }
                if let Some(auto_print) = auto_print {
                    current.auto_print = auto_print;
                }
                if let Some(threshold) = threshold {
                    current.low_stock_threshold = threshold;
                }
                json(&settings::update_settings(db, session, current).await?)
            }
            ShellCommand::Config => json(&settings::get_config(config)),

            ShellCommand::Quit => Ok(String::new()),
        }
    }

    fn show(&self, view: SessionView) -> ApiResult<String> {
        Ok(render_session(&view, &self.config))
    }
}

fn json<T: Serialize>(value: &T) -> ApiResult<String> {
    serde_json::to_string_pretty(value).map_err(|e| ApiError::internal(e.to_string()))
}

fn clip(text: &str, width: usize) -> String {
    text.chars().take(width).collect()
}

/// Cart tabs, active cart lines and the totals preview.
pub fn render_session(view: &SessionView, config: &ConfigState) -> String {
    let money = |cents: i64| config.format_currency(cents);
    let mut out = Vec::new();

    let tabs: Vec<String> = view
        .carts
        .iter()
        .map(|cart| {
            let marker = if cart.active { "*" } else { " " };
            format!("{}{}:{}", marker, cart.index + 1, cart.item_count)
        })
        .collect();
    out.push(format!("Carts {}   discount {}", tabs.join(" "), view.discount));

    if view.active.items.is_empty() {
        out.push("  (empty)".to_string());
    }
    for line in &view.active.items {
        let flag = if line.remaining < 0 { "  ! over stock" } else { "" };
        out.push(format!(
            "  {:<24} {:>4} x {:>10} = {:>11}  ({} left){}",
            clip(&line.name, 24),
            line.quantity,
            money(line.unit_price_cents),
            money(line.line_total_cents),
            line.remaining,
            flag
        ));
    }

    let totals = &view.active.totals;
    out.push(format!(
        "  Total {}  Discount {}  Pay {}{}",
        money(totals.raw_total.cents()),
        money(totals.discount_amount.cents()),
        money(totals.final_total.cents()),
        if totals.is_refund { "  (refund)" } else { "" }
    ));

    out.join("\n")
}

/// One product per line: id, name, stock, price, barcode.
pub fn render_products(products: &[ProductDto], config: &ConfigState) -> String {
    if products.is_empty() {
        return "No products".to_string();
    }

    products
        .iter()
        .map(|p| {
            format!(
                "{}  {:<30} {:>5} {:>11}  {}",
                p.id,
                clip(&p.name, 30),
                p.quantity,
                config.format_currency(p.sale_price_cents),
                p.barcode.as_deref().unwrap_or("-")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_alerts(alerts: &[LowStockAlert]) -> String {
    if alerts.is_empty() {
        return "No low-stock alerts".to_string();
    }

    alerts
        .iter()
        .map(|a| {
            let label = if a.is_out_of_stock() { "OUT" } else { "LOW" };
            format!("{} {:<30} {:>5} (threshold {})", label, clip(&a.name, 30), a.quantity, a.threshold)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
