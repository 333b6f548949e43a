use std::str::FromStr;

/// One line of interactive input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Vote { poll_id: i64, option_id: i64 },
    Like(i64),
    Unlike(i64),
    Toggle(i64),
    Focus(i64),
    Unfocus,
    Refresh,
    Create { title: String, options: Vec<String> },
    Stats,
    Help,
    Quit,
}

pub const HELP: &str = "commands: vote <poll> <option> | like <poll> | unlike <poll> | toggle <poll> | \
focus <poll> | unfocus | refresh | create <title> | <option> | <option>... | stats | help | quit";

fn id(arg: Option<&str>, what: &str) -> Result<i64, String> {
    let raw = arg.ok_or_else(|| format!("missing {what} id"))?;
    raw.parse().map_err(|_| format!("invalid {what} id: {raw}"))
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let mut args = rest.split_whitespace();
        let command = match word.to_ascii_lowercase().as_str() {
            "vote" | "v" => Command::Vote {
                poll_id: id(args.next(), "poll")?,
                option_id: id(args.next(), "option")?,
            },
            "like" => Command::Like(id(args.next(), "poll")?),
            "unlike" => Command::Unlike(id(args.next(), "poll")?),
            "toggle" | "t" => Command::Toggle(id(args.next(), "poll")?),
            "focus" | "f" => Command::Focus(id(args.next(), "poll")?),
            "unfocus" => Command::Unfocus,
            "refresh" | "r" => Command::Refresh,
            "create" => {
                let mut parts = rest.split('|').map(str::trim).filter(|p| !p.is_empty());
                let title = parts.next().ok_or("missing title")?.to_string();
                let options: Vec<String> = parts.map(str::to_string).collect();
                if options.len() < 2 {
                    return Err("a poll needs at least two options".into());
                }
                Command::Create { title, options }
            }
            "stats" => Command::Stats,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            "" => return Err("empty command".into()),
            other => return Err(format!("unknown command: {other}")),
        };
        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_actions() {
        assert_eq!(
            "vote 1 10".parse::<Command>(),
            Ok(Command::Vote { poll_id: 1, option_id: 10 })
        );
        assert_eq!(" Like 3 ".parse::<Command>(), Ok(Command::Like(3)));
        assert_eq!("t 3".parse::<Command>(), Ok(Command::Toggle(3)));
        assert_eq!("q".parse::<Command>(), Ok(Command::Quit));
    }

    #[test]
    fn parses_create_with_pipe_separated_options() {
        assert_eq!(
            "create Lunch today? | pizza | sushi ".parse::<Command>(),
            Ok(Command::Create {
                title: "Lunch today?".into(),
                options: vec!["pizza".into(), "sushi".into()],
            })
        );
        assert!("create Lunch | pizza".parse::<Command>().is_err());
    }

    #[test]
    fn reports_bad_input() {
        assert_eq!("vote 1".parse::<Command>(), Err("missing option id".into()));
        assert_eq!("like x".parse::<Command>(), Err("invalid poll id: x".into()));
        assert!("dance".parse::<Command>().is_err());
        assert!("".parse::<Command>().is_err());
    }
}
