//! Text output formatting with colors.

use chrono::Local;
use magneto_core::{ActionResult, AuthStatus, ChannelView, CredentialRecord, Program, RecordingView, format_timestamp};
use magneto_session::{ChannelDetails, Dashboard, PollOutcome};
use magneto_store::MagnetoConfig;

// ============================================================================
// ANSI Colors
// ============================================================================

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const CYAN: &str = "\x1b[36m";

/// Text formatter with optional colors.
pub struct TextFormatter {
    use_colors: bool,
}

impl TextFormatter {
    /// Creates a new text formatter.
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    // ========================================================================
    // Auth
    // ========================================================================

    /// Formats an authentication status with a color per state.
    pub fn format_status(&self, status: AuthStatus) -> String {
        let name = status.as_str();
        match status {
            AuthStatus::SessionCreated => self.green(name),
            AuthStatus::Authorized | AuthStatus::WaitingApproval => self.yellow(name),
            AuthStatus::NotStarted => self.red(name),
        }
    }

    /// Formats the credential snapshot. Token values are never printed.
    pub fn format_credentials(&self, record: &CredentialRecord) -> String {
        let present = |set: bool| if set { "present" } else { "none" };

        let mut lines = vec![
            self.bold("Box Authentication"),
            "─".repeat(40),
            format!("Status:        {}", self.format_status(record.auth_status)),
            format!("API URL:       {}", record.api_base_url),
            format!("App token:     {}", present(record.app_token.is_some())),
            format!("Session token: {}", present(record.session_token.is_some())),
        ];
        if let Some(track_id) = record.track_id {
            lines.push(format!("Track id:      {track_id}"));
        }
        if let Some(at) = record.last_auth_attempt {
            lines.push(format!(
                "Last attempt:  {}",
                at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
            ));
        }
        lines.join("\n")
    }

    /// Formats one status poll.
    pub fn format_poll(&self, outcome: &PollOutcome) -> String {
        let mut line = format!("[{}] {}", self.format_status(outcome.status), outcome.message);
        if let Some(approval) = outcome.approval {
            line.push_str(&self.dim(&format!(" (box: {approval})")));
        }
        line
    }

    /// Formats a generic action result.
    pub fn format_action(&self, result: &ActionResult) -> String {
        let mark = if result.success {
            self.green("✓")
        } else {
            self.red("✗")
        };
        match result.status {
            Some(status) => format!("{mark} {} [{}]", result.message, self.format_status(status)),
            None => format!("{mark} {}", result.message),
        }
    }

    // ========================================================================
    // Channels & Recordings
    // ========================================================================

    fn channel_line(&self, channel: &ChannelView, show_selection: bool) -> String {
        let mut line = String::new();
        if show_selection {
            line.push_str(if channel.selected { "[x] " } else { "[ ] " });
        }
        line.push_str(&self.bold(&channel.name));
        if channel.favorite {
            line.push_str(&self.yellow(" ★"));
        }
        line.push_str(&self.dim(&format!("  {}", channel.id)));
        line
    }

    /// Formats a channel list.
    pub fn format_channels(&self, channels: &[ChannelView], show_selection: bool) -> String {
        if channels.is_empty() {
            return if show_selection {
                "No channels available.".to_string()
            } else {
                "No channels selected. Use `magneto channels --all` to pick some.".to_string()
            };
        }
        channels
            .iter()
            .map(|c| self.channel_line(c, show_selection))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Formats the recordings table.
    pub fn format_recordings(&self, recordings: &[RecordingView]) -> String {
        if recordings.is_empty() {
            return "No scheduled recordings.".to_string();
        }
        recordings
            .iter()
            .map(|r| {
                format!(
                    "{} → {}  {:<24} {}  {}",
                    r.start_time,
                    r.end_time,
                    r.title,
                    self.cyan(&r.channel),
                    self.dim(&r.status)
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Formats the dashboard.
    pub fn format_dashboard(&self, dashboard: &Dashboard) -> String {
        let mut sections = vec![
            format!("{} [{}]", self.bold("Channels"), self.format_status(dashboard.status)),
            self.format_channels(&dashboard.channels, false),
            String::new(),
            self.bold("Recordings"),
        ];
        match &dashboard.pvr_error {
            Some(error) => sections.push(self.red(error)),
            None => sections.push(self.format_recordings(&dashboard.recordings)),
        }
        sections.join("\n")
    }

    fn format_program(&self, program: &Program) -> String {
        let title = program.title.as_deref().unwrap_or("Untitled");
        let mut line = format!("Now: {}", self.bold(title));
        if let Some(sub) = &program.sub_title {
            line.push_str(&format!(" - {sub}"));
        }
        if program.date.is_some() {
            line.push_str(&self.dim(&format!(" (since {})", format_timestamp(program.date))));
        }
        if let Some(desc) = &program.desc {
            line.push('\n');
            line.push_str(desc);
        }
        line
    }

    /// Formats a channel with its current program.
    pub fn format_channel_details(&self, details: &ChannelDetails) -> String {
        let mut lines = vec![self.channel_line(&details.channel, true)];
        if let Some(logo) = &details.channel.logo {
            lines.push(self.dim(&format!("Logo: {logo}")));
        }
        match &details.current_program {
            Some(program) => lines.push(self.format_program(program)),
            None => lines.push(self.dim("No program information.")),
        }
        lines.join("\n")
    }

    // ========================================================================
    // Config
    // ========================================================================

    /// Formats the configuration.
    pub fn format_config(&self, config: &MagnetoConfig) -> String {
        [
            self.bold("Magneto Configuration"),
            "─".repeat(40),
            format!("Default API URL:  {}", config.default_api_base_url),
            format!("Request timeout:  {}s", config.request_timeout_secs),
            format!("Approval window:  {}s", config.approval_timeout_secs),
            format!("Poll interval:    {}s", config.poll_interval_secs),
            format!("App id:           {}", config.app.app_id),
            format!("App name:         {}", config.app.app_name),
            format!("App version:      {}", config.app.app_version),
            format!("Device name:      {}", config.app.device_name),
        ]
        .join("\n")
    }

    // ========================================================================
    // Colors
    // ========================================================================

    fn paint(&self, color: &str, text: &str) -> String {
        if self.use_colors {
            format!("{color}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn bold(&self, text: &str) -> String {
        self.paint(BOLD, text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint(DIM, text)
    }

    fn green(&self, text: &str) -> String {
        self.paint(GREEN, text)
    }

    fn yellow(&self, text: &str) -> String {
        self.paint(YELLOW, text)
    }

    fn red(&self, text: &str) -> String {
        self.paint(RED, text)
    }

    fn cyan(&self, text: &str) -> String {
        self.paint(CYAN, text)
    }
}
