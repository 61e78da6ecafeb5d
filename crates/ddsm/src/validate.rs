//! configuration validation
//!
//! [validate] checks every rule and reports all violations together. It never changes the
//! configuration and never looks at resources.
use crate::config::{Configuration, Credential};
use crate::diagnostic::{Diagnostic, Diagnostics};

/// Sites data can be sent to
pub const SITES: &[&str] = &[
    "datadoghq.com",
    "datadoghq.eu",
    "us3.datadoghq.com",
    "us5.datadoghq.com",
    "ap1.datadoghq.com",
    "ap2.datadoghq.com",
    "ddog-gov.com",
];

#[tracing::instrument(level = "debug", skip_all)]
pub fn validate(config: &Configuration) -> Vec<Diagnostic> {
    let mut diagnostics = Diagnostics::default();

    check_credentials(config, &mut diagnostics);
    check_site(config, &mut diagnostics);
    check_extension(config, &mut diagnostics);

    diagnostics.into_vec()
}

fn check_credentials(config: &Configuration, diagnostics: &mut Diagnostics) {
    let set: Vec<Credential> = config
        .credentials()
        .into_iter()
        .map(|(credential, _)| credential)
        .collect();

    if set.len() < 2 {
        return;
    }

    diagnostics.log(Diagnostic::error(format!(
        "{} should not be set at the same time.",
        enumerate(&set)
    )));
}

// `a` and `b` / `a`, `b`, and `c`
fn enumerate(credentials: &[Credential]) -> String {
    let names: Vec<String> = credentials.iter().map(|c| format!("`{c}`")).collect();
    match names.as_slice() {
        [] => String::new(),
        [one] => one.clone(),
        [first, second] => format!("{first} and {second}"),
        [rest @ .., last] => format!("{}, and {last}", rest.join(", ")),
    }
}

fn check_site(config: &Configuration, diagnostics: &mut Diagnostics) {
    let site = config.site.trim();
    if SITES.iter().any(|known| known.eq_ignore_ascii_case(site)) {
        return;
    }

    diagnostics.log(Diagnostic::warning(format!(
        "site `{}` is not a known Datadog site; it must be one of {}. The value is used anyway.",
        config.site,
        SITES.join(", ")
    )));
}

fn check_extension(config: &Configuration, diagnostics: &mut Diagnostics) {
    if !config.extension_enabled() {
        return;
    }

    if config.forwarder_arn.is_some() {
        diagnostics.log(Diagnostic::error(
            "`extensionLayerVersion` and `forwarderArn` cannot be set at the same time.",
        ));
    }

    if config.credential().is_none() {
        diagnostics.log(Diagnostic::error(
            "when `extensionLayerVersion` is set, `apiKey`, `apiKMSKey`, or `apiKeySecretArn` must also be set.",
        ));
    }
}
