//! Fixed button vocabulary recognised by the executor.
//!
//! Labels are matched exactly (case-sensitive); callers trim surrounding
//! whitespace before lookup.

pub const BUTTON_DONE: &str = "Đã xong";
pub const BUTTON_BACK: &str = "Quay lại";
pub const BUTTON_CANCEL: &str = "Huỷ";
pub const BUTTON_MORE_HELP: &str = "Cần trợ giúp thêm";
pub const BUTTON_NO: &str = "Không";
pub const BUTTON_CONTINUE: &str = "Tiếp tục";
pub const BUTTON_RESTART: &str = "Khởi động lại";

pub const BUTTON_LABELS: [&str; 7] = [
    BUTTON_DONE,
    BUTTON_BACK,
    BUTTON_CANCEL,
    BUTTON_MORE_HELP,
    BUTTON_NO,
    BUTTON_CONTINUE,
    BUTTON_RESTART,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    Done,
    Back,
    Cancel,
    MoreHelp,
    No,
    Continue,
    Restart,
}

impl Button {
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            BUTTON_DONE => Some(Self::Done),
            BUTTON_BACK => Some(Self::Back),
            BUTTON_CANCEL => Some(Self::Cancel),
            BUTTON_MORE_HELP => Some(Self::MoreHelp),
            BUTTON_NO => Some(Self::No),
            BUTTON_CONTINUE => Some(Self::Continue),
            BUTTON_RESTART => Some(Self::Restart),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Done => BUTTON_DONE,
            Self::Back => BUTTON_BACK,
            Self::Cancel => BUTTON_CANCEL,
            Self::MoreHelp => BUTTON_MORE_HELP,
            Self::No => BUTTON_NO,
            Self::Continue => BUTTON_CONTINUE,
            Self::Restart => BUTTON_RESTART,
        }
    }

    pub fn is_resume_answer(self) -> bool {
        matches!(self, Self::Back | Self::No)
    }

    pub fn is_version_answer(self) -> bool {
        matches!(self, Self::Continue | Self::Restart)
    }
}
