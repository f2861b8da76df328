//! # Command Line
//!
//! ```text
//! apotheca [--db PATH] [shell | low-stock | report | create-admin]
//! ```
//!
//! With no subcommand the interactive register shell starts. Each line typed
//! into the shell is tokenized and parsed by [`ShellLine`], so shell
//! commands get the same argument handling and `help` output as the outer
//! command line.

use std::path::PathBuf;

use apotheca_core::{Category, Role};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(name = "apotheca", about = "Apotheca pharmacy register", version, long_about = None)]
pub struct Cli {
    /// SQLite database file (overrides APOTHECA_DB_PATH)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interactive register (default)
    Shell,

    /// Prints products at or below the low-stock threshold as JSON
    LowStock {
        /// Overrides the threshold from settings
        #[arg(long)]
        threshold: Option<i64>,
    },

    /// Prints a sales report as JSON
    Report {
        /// First day, YYYY-MM-DD (default: today, UTC)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Last day, inclusive (default: same as --from)
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Number of best sellers to list
        #[arg(long, default_value_t = 10)]
        top: u32,
    },

    /// Creates an admin account
    CreateAdmin {
        #[arg(long)]
        username: String,

        #[arg(long)]
        password: String,

        #[arg(long, default_value = "")]
        full_name: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RoleArg {
    Admin,
    Cashier,
}

impl From<RoleArg> for Role {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Admin => Role::Admin,
            RoleArg::Cashier => Role::Cashier,
        }
    }
}

// =============================================================================
// Shell Commands
// =============================================================================

/// One line of shell input.
#[derive(Debug, Parser)]
#[command(name = "register", no_binary_name = true, disable_version_flag = true)]
pub struct ShellLine {
    #[command(subcommand)]
    pub command: ShellCommand,
}

#[derive(Debug, Subcommand)]
pub enum ShellCommand {
    /// Starts a shift
    Login { username: String, password: String },

    /// Ends the shift and discards open carts
    Logout,

    /// Shows who is logged in
    Whoami,

    /// Searches by barcode or name fragment
    #[command(alias = "s")]
    Search {
        #[arg(num_args = 0.., trailing_var_arg = true)]
        query: Vec<String>,
    },

    /// Adds the product with this barcode to the active cart
    Scan { barcode: String },

    /// Adds a product to the active cart by id
    Add { product_id: String },

    /// Sets a line's quantity (negative for returns)
    #[command(alias = "qty")]
    Quantity {
        product_id: String,
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },

    /// Removes a line from the active cart
    Remove { product_id: String },

    /// Empties the active cart
    Clear,

    /// Shows the carts
    Cart,

    /// Parks the active cart and opens a new one
    NewCart,

    /// Switches to cart N (1-based)
    Switch { number: usize },

    /// Deletes cart N (1-based)
    DeleteCart { number: usize },

    /// Sets the discount percentage, e.g. `discount 10` or `discount 12.5`
    Discount { rate: String },

    /// Checks out the active cart and prints the receipt
    Checkout,

    /// Prints a past receipt again
    Reprint { receipt_number: String },

    /// Lists recent orders
    Orders {
        #[arg(long)]
        limit: Option<u32>,
    },

    /// Shows one product
    Product { id: String },

    /// Lists products with the same formula
    Substitutes { id: String },

    /// Lists products in a category
    Category { category: Category },

    /// Lists products at or below the low-stock threshold
    LowStock {
        #[arg(long)]
        threshold: Option<i64>,
    },

    /// Shows the latest low-stock alerts
    Alerts,

    /// Adds a product (admin)
    AddProduct {
        #[arg(long)]
        name: String,

        /// Sale price, e.g. 5.00
        #[arg(long, value_parser = parse_amount)]
        price: i64,

        /// Purchase price
        #[arg(long, value_parser = parse_amount, default_value = "0")]
        cost: i64,

        #[arg(long, default_value_t = 0)]
        stock: i64,

        #[arg(long)]
        barcode: Option<String>,

        #[arg(long, default_value = "other")]
        category: Category,

        /// Formula id
        #[arg(long)]
        formula: Option<String>,

        #[arg(long)]
        description: Option<String>,
    },

    /// Receives (positive) or writes off (negative) stock (admin)
    Restock {
        product_id: String,
        #[arg(allow_negative_numbers = true)]
        delta: i64,
    },

    /// Deletes a product that was never sold (admin)
    DeleteProduct { id: String },

    /// Lists formulas
    Formulas,

    /// Adds a formula (admin)
    AddFormula {
        name: String,
        #[arg(long)]
        description: Option<String>,
    },

    /// Deletes a formula (admin)
    DeleteFormula { id: String },

    /// Lists accounts (admin)
    Users,

    /// Creates an account (admin)
    AddUser {
        username: String,
        password: String,
        #[arg(long, value_enum, default_value_t = RoleArg::Cashier)]
        role: RoleArg,
        #[arg(long, default_value = "")]
        full_name: String,
    },

    /// Deletes an account (admin)
    DeleteUser { id: String },

    /// Changes your password, or another user's with --user (admin)
    Passwd {
        new_password: String,
        #[arg(long)]
        user: Option<String>,
    },

    /// Sales report (admin)
    Report {
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
        #[arg(long)]
        top: Option<u32>,
    },

    /// Shows store settings
    Settings,

    /// Changes store settings (admin)
    SetStore {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        auto_print: Option<bool>,
        #[arg(long)]
        threshold: Option<i64>,
    },

    /// Shows the register configuration
    Config,

    /// Leaves the shell
    #[command(alias = "exit")]
    Quit,
}

/// Splits a shell line on whitespace. Double quotes group words.
pub fn tokenize(line: &str) -> Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quoted = false;

    for c in line.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                in_token = true;
            }
            c if c.is_whitespace() && !quoted => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            c => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if quoted {
        return Err("unterminated quote".to_string());
    }
    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}

/// Parses an amount such as `5`, `5.5` or `5.25` into cents.
pub fn parse_amount(s: &str) -> Result<i64, String> {
    let s = s.trim();
    let (whole, frac) = s.split_once('.').unwrap_or((s, ""));

    let digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
    if (whole.is_empty() && frac.is_empty()) || frac.len() > 2 || !digits(whole) || !digits(frac)
    {
        return Err(format!("invalid amount '{}', expected e.g. 5.00", s));
    }

    let whole: i64 = match whole {
        "" => 0,
        w => w.parse().map_err(|_| format!("amount '{}' is too large", s))?,
    };
    let frac: i64 = format!("{:0<2}", frac)
        .parse()
        .map_err(|_| format!("invalid amount '{}'", s))?;

    whole
        .checked_mul(100)
        .and_then(|cents| cents.checked_add(frac))
        .ok_or_else(|| format!("amount '{}' is too large", s))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell(line: &str) -> ShellCommand {
        ShellLine::try_parse_from(tokenize(line).unwrap())
            .unwrap()
            .command
    }

    #[test]
    fn test_tokenize_quotes() {
        assert_eq!(
            tokenize(r#"add-product --name "Panadol 500mg" --price 5"#).unwrap(),
            vec!["add-product", "--name", "Panadol 500mg", "--price", "5"]
        );
        assert_eq!(tokenize("   ").unwrap(), Vec::<String>::new());
        assert_eq!(tokenize(r#"x """#).unwrap(), vec!["x", ""]);
        assert!(tokenize(r#"login "ayesha"#).is_err());
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("5").unwrap(), 500);
        assert_eq!(parse_amount("5.5").unwrap(), 550);
        assert_eq!(parse_amount("0.05").unwrap(), 5);
        assert_eq!(parse_amount(".75").unwrap(), 75);
        assert!(parse_amount("5.255").is_err());
        assert!(parse_amount("-5").is_err());
        assert!(parse_amount("abc").is_err());
        assert!(parse_amount(".").is_err());
    }

    #[test]
    fn test_shell_commands_parse() {
        match shell("qty 3f2a -2") {
            ShellCommand::Quantity {
                product_id,
                quantity,
            } => {
                assert_eq!(product_id, "3f2a");
                assert_eq!(quantity, -2);
            }
            other => panic!("unexpected {other:?}"),
        }

        match shell("search panadol 500") {
            ShellCommand::Search { query } => assert_eq!(query.join(" "), "panadol 500"),
            other => panic!("unexpected {other:?}"),
        }

        match shell("add-user ali pass123 --role admin") {
            ShellCommand::AddUser { role, .. } => assert_eq!(Role::from(role), Role::Admin),
            other => panic!("unexpected {other:?}"),
        }

        match shell("add-product --name Panadol --price 5.00 --category tablet") {
            ShellCommand::AddProduct {
                price,
                cost,
                category,
                ..
            } => {
                assert_eq!(price, 500);
                assert_eq!(cost, 0);
                assert_eq!(category, Category::Tablet);
            }
            other => panic!("unexpected {other:?}"),
        }

        assert!(matches!(shell("exit"), ShellCommand::Quit));
        assert!(ShellLine::try_parse_from(["fly"]).is_err());
    }

    #[test]
    fn test_outer_cli() {
        let cli = Cli::try_parse_from(["apotheca", "--db", "/tmp/a.db", "report", "--from", "2024-01-31"])
            .unwrap();
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/a.db")));
        match cli.command {
            Some(Command::Report { from, to, top }) => {
                assert_eq!(from, NaiveDate::from_ymd_opt(2024, 1, 31));
                assert_eq!(to, None);
                assert_eq!(top, 10);
            }
            other => panic!("unexpected {other:?}"),
        }

        let cli = Cli::try_parse_from(["apotheca"]).unwrap();
        assert!(cli.command.is_none());
    }
}
