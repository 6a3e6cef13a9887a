use crate::errors::ExtractError;
use crate::records::UpdateType;

lazy_regex!(DIGEST_RE = r"^[a-f0-9]{7,40}$");
lazy_regex!(NUMERIC_VERSION_RE = r"\d+(?:\.\d+){0,2}");

/// Major versions further apart than this count as `multiple_major` when enabled.
const MAJOR_DELTA_THRESHOLD: u64 = 1;

/// Short or full git SHAs and image digests carry no semantic ordering.
pub fn is_digest(version: &str) -> bool {
    DIGEST_RE.is_match(version)
}

/// Reduces a version string to its first `major[.minor[.patch]]` token.
///
/// `^1.2.3` and `~1.2.3` lose their range prefix, `1.x` becomes `1.0`, and
/// decorations such as `stable-v1.2.3` or `1.2.3-alpha.1` are dropped.
pub fn clean_version(version: &str) -> Result<String, ExtractError> {
    let stripped = version
        .strip_prefix('^')
        .or_else(|| version.strip_prefix('~'))
        .unwrap_or(version);
    let wildcards_zeroed = stripped.replace('x', "0");
    NUMERIC_VERSION_RE
        .find(&wildcards_zeroed)
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| ExtractError::version(version, "no major/minor/patch number found"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NumericVersion {
    major: u64,
    minor: u64,
}

impl NumericVersion {
    fn parse(raw: &str) -> Result<Self, ExtractError> {
        let cleaned = clean_version(raw)?;
        let mut parts = cleaned.split('.').map(|part| {
            part.parse::<u64>()
                .map_err(|err| ExtractError::version(raw, format!("component {part:?}: {err}")))
        });
        let major = parts.next().transpose()?.unwrap_or(0);
        let minor = parts.next().transpose()?.unwrap_or(0);
        // the patch level never decides the update type, but it must still be numeric
        parts.next().transpose()?;
        Ok(Self { major, minor })
    }
}

#[derive(Debug, Clone, Default)]
pub struct VersionClassifier {
    detect_multiple_major: bool,
}

impl VersionClassifier {
    pub fn new(detect_multiple_major: bool) -> Self {
        Self {
            detect_multiple_major,
        }
    }

    /// Assigns the update type of one `old -> new` change.
    ///
    /// Digests are recognised before anything else. Otherwise both versions must
    /// parse, even for security PRs, so a malformed row still fails its PR.
    pub fn classify(
        &self,
        old_version: &str,
        new_version: &str,
        security: bool,
    ) -> Result<UpdateType, ExtractError> {
        if is_digest(old_version) {
            return Ok(UpdateType::Digest);
        }

        let old = NumericVersion::parse(old_version)?;
        let new = NumericVersion::parse(new_version)?;

        let update_type = if security {
            UpdateType::Security
        } else if old.major != new.major {
            if self.detect_multiple_major
                && new.major.saturating_sub(old.major) > MAJOR_DELTA_THRESHOLD
            {
                UpdateType::MultipleMajor
            } else {
                UpdateType::Major
            }
        } else if old.minor != new.minor {
            UpdateType::Minor
        } else {
            UpdateType::Patch
        };
        Ok(update_type)
    }
}
