use std::{borrow::Cow, time::Duration};

use indicatif::{ProgressBar, ProgressFinish, ProgressStyle};

pub(crate) fn progress_bar(len: usize, message: impl Into<Cow<'static, str>>) -> ProgressBar {
    let message = message.into();
    let fmt = if !message.is_empty() {
        "{msg} {wide_bar} {pos:>5}/{len:>5} ETA: {eta_precise} Elapsed: {elapsed_precise}"
    } else {
        "{wide_bar} {pos:>5}/{len:>5} ETA: {eta_precise} Elapsed: {elapsed_precise}"
    };
    ProgressBar::new(len as u64)
        .with_style(
            ProgressStyle::default_bar()
                .template(fmt)
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        )
        .with_finish(ProgressFinish::AndLeave)
        .with_message(message)
}

/// A spinner for work with no meaningful progress count. It ticks on its own until finished.
pub(crate) fn progress_spinner(message: impl Into<Cow<'static, str>>) -> ProgressBar {
    let spinner = ProgressBar::new_spinner()
        .with_style(
            ProgressStyle::default_spinner()
                .tick_strings(&[
                    "▹▹▹▹▹",
                    "▸▹▹▹▹",
                    "▹▸▹▹▹",
                    "▹▹▸▹▹",
                    "▹▹▹▸▹",
                    "▹▹▹▹▸",
                    "▪▪▪▪▪",
                ])
                .template("{msg} {spinner} Elapsed: {elapsed_precise}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        )
        .with_finish(ProgressFinish::AndLeave)
        .with_message(message.into());
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}
