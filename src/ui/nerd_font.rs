/// Icons used in operator-facing output. Requires a nerd font in the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NerdFont {
    Check,
    Cross,
    Warning,
    Info,
    Question,
    HardDrive,
    Partition,
    Eraser,
    Folder,
    Clock,
    Globe,
    FileText,
    Terminal,
}

impl NerdFont {
    pub fn unicode(self) -> char {
        match self {
            Self::Check => '\u{f00c}',     // fa-check
            Self::Cross => '\u{f00d}',     // fa-times
            Self::Warning => '\u{f071}',   // fa-exclamation-triangle
            Self::Info => '\u{f05a}',      // fa-info-circle
            Self::Question => '\u{f128}',  // fa-question
            Self::HardDrive => '\u{f0a0}', // fa-hdd
            Self::Partition => '\u{f1c0}', // fa-database
            Self::Eraser => '\u{f12d}',    // fa-eraser
            Self::Folder => '\u{f07b}',    // fa-folder
            Self::Clock => '\u{f017}',     // fa-clock
            Self::Globe => '\u{f0ac}',     // fa-globe
            Self::FileText => '\u{f15c}',  // fa-file-text
            Self::Terminal => '\u{f120}',  // fa-terminal
        }
    }
}

impl std::fmt::Display for NerdFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.unicode())
    }
}

impl From<NerdFont> for char {
    fn from(icon: NerdFont) -> Self {
        icon.unicode()
    }
}
