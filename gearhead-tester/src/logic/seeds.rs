use anyhow::{Context, Result, bail};

/// Seed parsed from a CLI token, remembering how it was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedInfo {
    pub seed: u64,
    pub token: Option<String>,
}

impl SeedInfo {
    #[must_use]
    pub const fn from_numeric(seed: u64) -> Self {
        Self { seed, token: None }
    }

    #[must_use]
    pub fn from_token(seed: u64, token: &str) -> Self {
        Self {
            seed,
            token: Some(token.to_string()),
        }
    }
}

/// Resolve a list of CLI seed arguments into canonical seed metadata.
///
/// Supports decimal integers (negative values use their magnitude) and
/// `0x`-prefixed hex. Duplicates are dropped; an empty list yields 1337.
pub fn resolve_seed_inputs(tokens: &[String]) -> Result<Vec<SeedInfo>> {
    let mut resolved: Vec<SeedInfo> = Vec::new();

    for token in tokens {
        if token.is_empty() {
            continue;
        }

        let info = if let Some(hex) = token
            .strip_prefix("0x")
            .or_else(|| token.strip_prefix("0X"))
        {
            let seed = u64::from_str_radix(hex, 16)
                .with_context(|| format!("invalid hex seed: {token}"))?;
            SeedInfo::from_token(seed, token)
        } else if let Ok(value) = token.parse::<i64>() {
            SeedInfo::from_numeric(value.unsigned_abs())
        } else if let Ok(value) = token.parse::<u64>() {
            SeedInfo::from_numeric(value)
        } else {
            bail!("Unrecognized seed token: {token}");
        };

        if !resolved.iter().any(|existing| existing.seed == info.seed) {
            resolved.push(info);
        }
    }

    if resolved.is_empty() {
        resolved.push(SeedInfo::from_numeric(1337));
    }

    Ok(resolved)
}
