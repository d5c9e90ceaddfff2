//! Console counterparts of the editor's toast macros.
//!
//! Each macro formats its message, logs it through [`log`] and prints it to
//! the terminal with a coloured prefix.

/// Fatal log macro
///
/// Prints the message to stderr under a red `error:` prefix and logs with
/// [`log::error!`].
macro_rules! fatal {
    ($($arg:tt)*) => {{
        let _msg = format!($($arg)*);
        log::error!("{}", _msg);

        {
            use colored::Colorize;
            eprintln!("{} {}", "error:".red().bold(), _msg);
        }
    }};
}

/// Success log macro
///
/// Prints the message under a green `done:` prefix and logs with
/// [`log::info!`].
macro_rules! success {
    ($($arg:tt)*) => {{
        let _msg = format!($($arg)*);
        log::info!("{}", _msg);

        {
            use colored::Colorize;
            println!("{} {}", "done:".green().bold(), _msg);
        }
    }};
}

/// Warn log macro
///
/// For things the user should know about that did not stop the command.
macro_rules! warn {
    ($($arg:tt)*) => {{
        let _msg = format!($($arg)*);
        log::warn!("{}", _msg);

        {
            use colored::Colorize;
            eprintln!("{} {}", "warning:".yellow().bold(), _msg);
        }
    }};
}

/// Notice log macro
///
/// Notifies the user of something that isn't important, logs with
/// [`log::debug!`].
macro_rules! notice {
    ($($arg:tt)*) => {{
        let _msg = format!($($arg)*);
        log::debug!("{}", _msg);

        {
            use colored::Colorize;
            println!("{}", _msg.dimmed());
        }
    }};
}
