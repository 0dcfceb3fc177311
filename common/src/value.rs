use std::fmt;

/// What a poller hands to a backend.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PollValue {
    /// No usable value this cycle.
    #[default]
    Empty,
    Number(f64),
    Tuple(Vec<f64>),
}

impl PollValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, PollValue::Empty)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            PollValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for PollValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollValue::Empty => f.write_str("-"),
            PollValue::Number(n) => write!(f, "{n}"),
            PollValue::Tuple(values) => {
                let joined = values
                    .iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<String>>()
                    .join(", ");
                write!(f, "({joined})")
            }
        }
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
