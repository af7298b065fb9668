// SPDX-FileCopyrightText: 2026 Midway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Presentation adapter between a selection surface and the middleware host.
//!
//! The adapter owns no state of its own. It turns surface events (refresh,
//! selection change, run) into host calls and routes every user-facing
//! failure through an [`ErrorChannel`] instead of returning it.

use std::cell::Cell;

use midway_core::{MidwayError, ProcessingContext, ProcessingResult, parse_config_payload};
use midway_plugin::parse_selection;
use midway_runtime::MiddlewareHost;
use tracing::error;

/// Where user-facing failures are reported.
pub trait ErrorChannel {
    fn report(&self, error: &MidwayError);
}

impl<T: ErrorChannel + ?Sized> ErrorChannel for &T {
    fn report(&self, error: &MidwayError) {
        (**self).report(error);
    }
}

/// Reports failures on stderr, in red unless `plain` is set.
pub struct StderrChannel {
    plain: bool,
    reported: Cell<usize>,
}

impl StderrChannel {
    pub fn new(plain: bool) -> Self {
        Self {
            plain,
            reported: Cell::new(0),
        }
    }

    /// Number of failures reported so far.
    pub fn reported(&self) -> usize {
        self.reported.get()
    }
}

impl ErrorChannel for StderrChannel {
    fn report(&self, err: &MidwayError) {
        self.reported.set(self.reported.get() + 1);
        error!(error = %err, "middleware operation failed");
        if self.plain {
            eprintln!("  [ERROR] {err}");
        } else {
            use colored::Colorize;
            eprintln!("  {} {}", "✗".red(), err.to_string().red());
        }
    }
}

/// What the surface shows for the selected unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitPanel {
    /// Markdown with the unit's name and description.
    pub info: String,
    /// Pretty-printed default configuration for the editor.
    pub config_text: String,
}

pub struct PresentationAdapter<'h, C: ErrorChannel> {
    host: &'h MiddlewareHost,
    errors: C,
}

impl<'h, C: ErrorChannel> PresentationAdapter<'h, C> {
    pub fn new(host: &'h MiddlewareHost, errors: C) -> Self {
        Self { host, errors }
    }

    #[cfg(test)]
    pub fn errors(&self) -> &C {
        &self.errors
    }

    /// Choices for the selection control.
    pub fn choices(&self) -> Vec<String> {
        self.host.list_selectable_units()
    }

    /// Refreshes the catalog and re-derives the choices.
    ///
    /// A catalog write failure is reported; the choices still reflect the new
    /// discovery pass.
    pub fn refresh(&self) -> Vec<String> {
        if let Err(e) = self.host.refresh_catalog() {
            self.errors.report(&e);
        }
        self.choices()
    }

    /// Builds the panel for `selection`. An empty selection shows nothing.
    pub fn on_change(&self, selection: &str) -> Option<UnitPanel> {
        let class = match self.host.resolve(Some(selection)) {
            Ok(class) => class,
            Err(MidwayError::NoSelection) => return None,
            Err(e) => {
                self.errors.report(&e);
                return None;
            }
        };

        let config_text = match serde_json::to_string_pretty(&class.default_configuration()) {
            Ok(text) => text,
            Err(e) => {
                self.errors.report(&MidwayError::Internal(format!(
                    "failed to render default configuration: {e}"
                )));
                return None;
            }
        };

        Some(UnitPanel {
            info: format!("## {}\n\n{}", class.name(), class.description()),
            config_text,
        })
    }

    /// Runs the selected unit with the edited configuration text.
    ///
    /// A missing selection is checked first, then the configuration is
    /// parsed, so no unit is reloaded for a payload that cannot be used.
    pub async fn on_run(
        &self,
        selection: Option<&str>,
        config_text: &str,
        context: ProcessingContext,
    ) -> Option<ProcessingResult> {
        match self.try_run(selection, config_text, context).await {
            Ok(result) => Some(result),
            Err(e) => {
                self.errors.report(&e);
                None
            }
        }
    }

    async fn try_run(
        &self,
        selection: Option<&str>,
        config_text: &str,
        context: ProcessingContext,
    ) -> Result<ProcessingResult, MidwayError> {
        if selection.map(parse_selection).transpose()?.flatten().is_none() {
            return Err(MidwayError::NoSelection);
        }
        let config = parse_config_payload(config_text)?;
        self.host.dispatch(selection, Some(config), context).await
    }
}
