mod support;

use analysis::{
    CloseType, DependencyUpdate, ExtractError, PrClassifier, PrKind, RecordExtractor, UpdateType,
    VersionClassifier,
};
use support::{pull_request, utc};

const LODASH_BODY: &str = r#"[![Mend Renovate](https://app.renovatebot.com/images/banner.svg)](https://renovatebot.com)

This PR contains the following updates:

| Package | Change | Age | Adoption | Passing | Confidence |
|---|---|---|---|---|---|
| [lodash](https://lodash.com/) ([source](https://github.com/lodash/lodash)) | [`4.17.0` -> `4.17.21`](https://renovatebot.com/diffs/npm/lodash/4.17.0/4.17.21) | [![age](https://developer.mend.io/api/mc/badges/age/npm/lodash/4.17.21?slim=true)](https://docs.renovatebot.com/merge-confidence/) | [![adoption](https://developer.mend.io/api/mc/badges/adoption/npm/lodash/4.17.21?slim=true)](https://docs.renovatebot.com/merge-confidence/) | [![passing](https://developer.mend.io/api/mc/badges/compatibility/npm/lodash/4.17.0/4.17.21?slim=true)](https://docs.renovatebot.com/merge-confidence/) | [![confidence](https://developer.mend.io/api/mc/badges/confidence/npm/lodash/4.17.0/4.17.21?slim=true)](https://docs.renovatebot.com/merge-confidence/) |

---

### Release Notes

<details>
<summary>lodash/lodash (lodash)</summary>

</details>

---

### Configuration

📅 **Schedule**: Branch creation - At any time (no schedule defined).
"#;

fn classifier() -> PrClassifier {
    PrClassifier::new("^Configure Renovate", Some("renovate[bot]".into()), None, vec![]).unwrap()
}

#[test]
fn lodash_patch_end_to_end() {
    let mut pr = pull_request(42, "Update dependency lodash to v4.17.21", LODASH_BODY);
    pr.merged_at = Some(utc(2024, 1, 3, 10));
    pr.closed_at = Some(utc(2024, 1, 3, 10));

    assert_eq!(classifier().classify(&pr), PrKind::DependencyUpdate);

    let record = RecordExtractor::new(VersionClassifier::default(), "security")
        .extract(&pr)
        .unwrap();
    assert_eq!(
        record.dependency_updates,
        vec![DependencyUpdate {
            dependency_name: "lodash".into(),
            old_version: "4.17.0".into(),
            new_version: "4.17.21".into(),
            update_type: UpdateType::Patch,
        }]
    );
    assert_eq!(record.close_type, Some(CloseType::Merge));
    assert_eq!(record.url, "https://github.com/acme/web/pull/42");
}

#[test]
fn autoclosed_group_update_with_multiple_major() {
    let body = "This PR contains the following updates:\n\n\
        | Package | Type | Update | Change |\n\
        |---|---|---|---|\n\
        | [react](https://react.dev/) | dependencies | major | [`^16.14.0` -> `^18.2.0`](https://renovatebot.com/diffs/npm/react/16.14.0/18.2.0) |\n\
        | [react-dom](https://react.dev/) | dependencies | major | [`^16.14.0` -> `^18.2.0`](https://renovatebot.com/diffs/npm/react-dom/16.14.0/18.2.0) |\n";
    let mut pr = pull_request(7, "Update react monorepo to v18 (major) - autoclosed", body);
    pr.closed_at = Some(utc(2024, 2, 1, 0));

    assert_eq!(classifier().classify(&pr), PrKind::DependencyUpdate);
    let record = RecordExtractor::new(VersionClassifier::new(true), "security")
        .extract(&pr)
        .unwrap();
    assert_eq!(record.close_type, Some(CloseType::Close));
    assert_eq!(record.dependency_updates.len(), 2);
    assert!(record
        .dependency_updates
        .iter()
        .all(|u| u.update_type == UpdateType::MultipleMajor));
}

#[test]
fn body_without_table_is_rejected() {
    let pr = pull_request(8, "Update dependency eslint to v9", "Just some text.\n\nNo table.");
    let err = RecordExtractor::new(VersionClassifier::default(), "security")
        .extract(&pr)
        .unwrap_err();
    assert!(matches!(err, ExtractError::MalformedUpdateTable(_)));
}
