//! Text command parsing.

use crate::domain::{ChatId, Decimal};
use thiserror::Error;

/// Amount argument of `/withdraw_bonus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WithdrawAmount {
    All,
    Amount(Decimal),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    // Investor commands
    Start,
    About,
    MyName(String),
    Wallet,
    SetWallet { address: String, network: String },
    AddDeposit(Decimal),
    AddFromBonus(Decimal),
    /// `None` asks for the available amount.
    WithdrawBonus(Option<WithdrawAmount>),
    WithdrawAll,
    Balance,

    // Admin commands
    Help,
    List,
    AddUser {
        chat_id: ChatId,
        name: String,
        deposit: Decimal,
    },
    SetDeposit { chat_id: ChatId, amount: Decimal },
    SetName { chat_id: ChatId, name: String },
    Remove(ChatId),
    Requests,
    Approve(i64),
    Reject(i64),
}

impl Command {
    pub fn is_admin(&self) -> bool {
        matches!(
            self,
            Command::Help
                | Command::List
                | Command::AddUser { .. }
                | Command::SetDeposit { .. }
                | Command::SetName { .. }
                | Command::Remove(_)
                | Command::Requests
                | Command::Approve(_)
                | Command::Reject(_)
        )
    }
}

/// Why a recognised command could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("usage: {usage}")]
    Usage { usage: &'static str, admin: bool },

    #[error("amount must be greater than zero")]
    NonPositiveAmount,
}

impl ParseError {
    /// Whether the failed command was an admin command.
    pub fn is_admin(&self) -> bool {
        matches!(self, ParseError::Usage { admin: true, .. })
    }
}

fn usage(usage: &'static str) -> ParseError {
    ParseError::Usage {
        usage,
        admin: false,
    }
}

fn admin_usage(usage: &'static str) -> ParseError {
    ParseError::Usage { usage, admin: true }
}

/// Parse a chat message.
///
/// Returns `Ok(None)` for plain text and unknown commands. A `@botname`
/// suffix on the command is ignored.
pub fn parse(text: &str) -> Result<Option<Command>, ParseError> {
    let text = text.trim();
    if !text.starts_with('/') {
        return Ok(None);
    }

    let (head, rest) = match text.find(char::is_whitespace) {
        Some(idx) => (&text[..idx], text[idx..].trim()),
        None => (text, ""),
    };
    let name = head[1..].split('@').next().unwrap_or("").to_lowercase();
    let args: Vec<&str> = rest.split_whitespace().collect();

    let command = match name.as_str() {
        "start" => Command::Start,
        "about" => Command::About,
        "myname" => {
            if rest.is_empty() {
                return Err(usage("/myname First Last"));
            }
            Command::MyName(rest.to_string())
        }
        "wallet" => Command::Wallet,
        "setwallet" => {
            if args.len() < 2 {
                return Err(usage("/setwallet YourAddress TRC20"));
            }
            Command::SetWallet {
                address: args[0].to_string(),
                network: args[1].to_uppercase(),
            }
        }
        "add_deposit" => Command::AddDeposit(positive_amount(rest, "/add_deposit 500")?),
        "add_from_bonus" => Command::AddFromBonus(positive_amount(rest, "/add_from_bonus 100")?),
        "withdraw_bonus" => {
            if rest.is_empty() {
                Command::WithdrawBonus(None)
            } else if rest.eq_ignore_ascii_case("all") {
                Command::WithdrawBonus(Some(WithdrawAmount::All))
            } else {
                let amount = Decimal::parse_money(rest)
                    .ok_or_else(|| usage("/withdraw_bonus 100 or /withdraw_bonus all"))?;
                Command::WithdrawBonus(Some(WithdrawAmount::Amount(amount)))
            }
        }
        "withdraw_all" => Command::WithdrawAll,
        "balance" => Command::Balance,

        "help" => Command::Help,
        "list" => Command::List,
        "adduser" => {
            const USAGE: &str = "/adduser <chat_id> <name> <deposit>";
            if args.len() < 3 {
                return Err(admin_usage(USAGE));
            }
            let chat_id: ChatId = args[0].parse().map_err(|_| admin_usage(USAGE))?;
            let deposit = Decimal::parse_money(args[args.len() - 1])
                .filter(|d| !d.is_negative())
                .ok_or_else(|| admin_usage(USAGE))?;
            let name = args[1..args.len() - 1].join(" ");
            Command::AddUser {
                chat_id,
                name: if name.is_empty() {
                    chat_id.to_string()
                } else {
                    name
                },
                deposit,
            }
        }
        "setdep" => {
            const USAGE: &str = "/setdep <chat_id> <deposit>";
            if args.len() < 2 {
                return Err(admin_usage(USAGE));
            }
            let chat_id: ChatId = args[0].parse().map_err(|_| admin_usage(USAGE))?;
            let amount = Decimal::parse_money(&args[1..].join(""))
                .filter(|d| !d.is_negative())
                .ok_or_else(|| admin_usage(USAGE))?;
            Command::SetDeposit { chat_id, amount }
        }
        "setname" => {
            const USAGE: &str = "/setname <chat_id> <name>";
            if args.len() < 2 {
                return Err(admin_usage(USAGE));
            }
            let chat_id: ChatId = args[0].parse().map_err(|_| admin_usage(USAGE))?;
            Command::SetName {
                chat_id,
                name: args[1..].join(" "),
            }
        }
        "remove" => {
            const USAGE: &str = "/remove <chat_id>";
            let chat_id: ChatId = args
                .first()
                .and_then(|a| a.parse().ok())
                .ok_or_else(|| admin_usage(USAGE))?;
            Command::Remove(chat_id)
        }
        "requests" => Command::Requests,
        "approve" => Command::Approve(request_id(&args, "/approve <request_id>")?),
        "reject" => Command::Reject(request_id(&args, "/reject <request_id>")?),
        _ => return Ok(None),
    };
    Ok(Some(command))
}

fn positive_amount(rest: &str, usage_text: &'static str) -> Result<Decimal, ParseError> {
    if rest.is_empty() {
        return Err(usage(usage_text));
    }
    let amount = Decimal::parse_money(rest).ok_or_else(|| usage(usage_text))?;
    if !amount.is_positive() {
        return Err(ParseError::NonPositiveAmount);
    }
    Ok(amount)
}

fn request_id(args: &[&str], usage_text: &'static str) -> Result<i64, ParseError> {
    args.first()
        .map(|a| a.trim_start_matches('#'))
        .and_then(|a| a.parse().ok())
        .ok_or_else(|| admin_usage(usage_text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    #[test]
    fn test_plain_text_and_unknown_commands_are_ignored() {
        assert_eq!(parse("hello"), Ok(None));
        assert_eq!(parse("/unknown 1 2"), Ok(None));
        assert_eq!(parse(""), Ok(None));
    }

    #[test]
    fn test_bot_suffix_and_case() {
        assert_eq!(parse("/Balance@SomeBot"), Ok(Some(Command::Balance)));
        assert_eq!(parse("  /start  "), Ok(Some(Command::Start)));
    }

    #[test]
    fn test_myname_keeps_full_name() {
        assert_eq!(
            parse("/myname  Ivan   Petrov "),
            Ok(Some(Command::MyName("Ivan   Petrov".to_string())))
        );
        assert!(matches!(parse("/myname"), Err(ParseError::Usage { .. })));
    }

    #[test]
    fn test_setwallet_uppercases_network() {
        assert_eq!(
            parse("/setwallet TXabc trc20"),
            Ok(Some(Command::SetWallet {
                address: "TXabc".to_string(),
                network: "TRC20".to_string()
            }))
        );
        assert!(parse("/setwallet TXabc").is_err());
    }

    #[test]
    fn test_amounts_are_lenient() {
        assert_eq!(
            parse("/add_deposit 1 234,50"),
            Ok(Some(Command::AddDeposit(d("1234.50"))))
        );
        assert_eq!(
            parse("/add_deposit $500 USDT"),
            Ok(Some(Command::AddDeposit(d("500"))))
        );
        assert_eq!(parse("/add_deposit 0"), Err(ParseError::NonPositiveAmount));
        assert!(matches!(
            parse("/add_deposit 79228162514264337593543950335"),
            Err(ParseError::Usage { admin: false, .. })
        ));
        assert!(matches!(
            parse("/setdep 42 1e27"),
            Err(ParseError::Usage { admin: true, .. })
        ));
        assert!(matches!(
            parse("/add_from_bonus abc"),
            Err(ParseError::Usage { admin: false, .. })
        ));
    }

    #[test]
    fn test_withdraw_bonus_forms() {
        assert_eq!(
            parse("/withdraw_bonus"),
            Ok(Some(Command::WithdrawBonus(None)))
        );
        assert_eq!(
            parse("/withdraw_bonus ALL"),
            Ok(Some(Command::WithdrawBonus(Some(WithdrawAmount::All))))
        );
        assert_eq!(
            parse("/withdraw_bonus 12.5"),
            Ok(Some(Command::WithdrawBonus(Some(WithdrawAmount::Amount(d(
                "12.5"
            ))))))
        );
    }

    #[test]
    fn test_adduser_name_spans_middle_args() {
        assert_eq!(
            parse("/adduser 123 Anna Maria 600"),
            Ok(Some(Command::AddUser {
                chat_id: ChatId::new(123),
                name: "Anna Maria".to_string(),
                deposit: d("600"),
            }))
        );
        let err = parse("/adduser abc Anna 600").unwrap_err();
        assert!(err.is_admin());
        assert!(parse("/adduser 123 600").is_err());
    }

    #[test]
    fn test_setdep_accepts_grouped_amount() {
        assert_eq!(
            parse("/setdep -100 1 500"),
            Ok(Some(Command::SetDeposit {
                chat_id: ChatId::new(-100),
                amount: d("1500"),
            }))
        );
        assert!(parse("/setdep 5").unwrap_err().is_admin());
    }

    #[test]
    fn test_request_resolution_ids() {
        assert_eq!(parse("/approve 7"), Ok(Some(Command::Approve(7))));
        assert_eq!(parse("/reject #8"), Ok(Some(Command::Reject(8))));
        assert!(parse("/approve").unwrap_err().is_admin());
    }

    #[test]
    fn test_admin_classification() {
        assert!(Command::Requests.is_admin());
        assert!(Command::Remove(ChatId::new(1)).is_admin());
        assert!(!Command::Balance.is_admin());
    }
}
