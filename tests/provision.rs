//! Folder provisioning and access policy against the in-memory platform.

mod common;

use common::{CONTRIBUTORS_ID, folder_id, seeded, teams, v8};
use htan2_synapse::catalog::folders_per_tier;
use htan2_synapse::config::files::SubfolderEntry;
use htan2_synapse::platform::Platform;
use htan2_synapse::provision::{GrantStatus, PolicyEngine, Principal, Provisioner, policy};
use htan2_synapse::types::{AccessSet, ResourceAccess, Tier};

#[test]
fn test_fresh_provisioning_creates_each_tier_once() {
    let (platform, project) = seeded("HTAN2_Ovarian");
    let outcome = Provisioner::new(&platform).provision(&project, &v8(), &[Tier::Ingest, Tier::Staging]);

    assert!(outcome.failures.is_empty());
    assert_eq!(platform.folder_creations(), 2 * (1 + folders_per_tier()));

    let ingest = &outcome.folders.folders["v8_ingest"];
    let staging = &outcome.folders.folders["v8_staging"];
    assert_ne!(ingest.synapse_id, staging.synapse_id);
    assert_ne!(
        ingest.modules["Clinical"].synapse_id,
        staging.modules["Clinical"].synapse_id
    );
    assert_eq!(
        folder_id(&platform, &project.synapse_id, "v8_staging/WES/Level_2").as_deref(),
        Some(staging.modules["WES"].subfolders["Level_2"].id())
    );
}

#[test]
fn test_second_run_creates_nothing() {
    let (platform, project) = seeded("HTAN2_Ovarian");
    let provisioner = Provisioner::new(&platform);
    let first = provisioner.provision(&project, &v8(), &Tier::ALL);
    let created = platform.folder_creations();

    let second = provisioner.provision(&project, &v8(), &Tier::ALL);
    assert_eq!(platform.folder_creations(), created);
    assert_eq!(first.folders, second.folders);
}

#[test]
fn test_imaging_multiplex_levels_are_nested() {
    let (platform, project) = seeded("HTAN2_Ovarian");
    let outcome = Provisioner::new(&platform).provision(&project, &v8(), &[Tier::Staging]);

    let imaging = &outcome.folders.folders["v8_staging"].modules["Imaging"];
    assert!(matches!(imaging.subfolders["DigitalPathology"], SubfolderEntry::Id(_)));
    let levels = imaging.subfolders["MultiplexMicroscopy"]
        .subfolders()
        .expect("nested levels");
    assert_eq!(levels.keys().collect::<Vec<_>>(), ["Level_2", "Level_3", "Level_4"]);
}

#[test]
fn test_rerun_after_failure_fills_gap_only() {
    let (platform, project) = seeded("HTAN2_Ovarian");
    let provisioner = Provisioner::new(&platform);

    platform.fail_folder("WES");
    let first = provisioner.provision(&project, &v8(), &[Tier::Ingest]);
    assert_eq!(first.failures.len(), 1);
    assert_eq!(first.failures[0].path, "v8_ingest/WES");
    assert!(!first.folders.folders["v8_ingest"].modules.contains_key("WES"));
    assert!(first.folders.folders["v8_ingest"].modules.contains_key("scRNA_seq"));

    platform.heal_folder("WES");
    let second = provisioner.provision(&project, &v8(), &[Tier::Ingest]);
    assert!(second.failures.is_empty());
    let before = &first.folders.folders["v8_ingest"].modules["Clinical"];
    let after = &second.folders.folders["v8_ingest"].modules["Clinical"];
    assert_eq!(before, after);
    assert_eq!(second.folders.folders["v8_ingest"].modules["WES"].subfolders.len(), 3);
}

#[test]
fn test_applied_policy_verifies_on_every_tier() {
    let (platform, project) = seeded("HTAN2_Ovarian");
    let outcome = Provisioner::new(&platform).provision(&project, &v8(), &Tier::ALL);
    let engine = PolicyEngine::new(&platform, teams());

    for (tier, folder) in outcome.tier_folders() {
        let grants = engine.apply(folder, tier, &project.name);
        assert_eq!(grants.len(), 4);
        assert!(grants.iter().all(|g| g.status == GrantStatus::Applied));

        let report = engine.verify(folder, tier, &project.name).unwrap();
        assert!(report.is_conformant(), "{tier} not conformant: {report:?}");
    }
}

#[test]
fn test_staging_contributors_cannot_create() {
    let (platform, project) = seeded("HTAN2_Ovarian");
    let outcome = Provisioner::new(&platform).provision(&project, &v8(), &[Tier::Staging]);
    let folder = &outcome.folders.folders["v8_staging"].synapse_id;
    PolicyEngine::new(&platform, teams()).apply(folder, Tier::Staging, &project.name);

    let acl = platform.get_acl(folder).unwrap();
    let (granted, _) = AccessSet::from_names(&acl.entry(CONTRIBUTORS_ID).unwrap().access_type);
    assert_eq!(granted, policy(Tier::Staging, Principal::Contributors));
    assert!(granted.has(AccessSet::UPDATE));
    assert!(!granted.has(AccessSet::CREATE));
}

#[test]
fn test_release_breaks_inheritance() {
    let (platform, project) = seeded("HTAN2_Ovarian");
    platform.set_acl(
        &project.synapse_id,
        vec![ResourceAccess {
            principal_id: 999,
            access_type: vec!["READ".into()],
        }],
    );
    let outcome = Provisioner::new(&platform).provision(&project, &v8(), &[Tier::Release]);
    let folder = outcome.folders.folders["v8_release"].synapse_id.clone();
    let engine = PolicyEngine::new(&platform, teams());

    let before = engine.verify(&folder, Tier::Release, &project.name).unwrap();
    assert!(before.inherited);
    assert!(!before.is_conformant());

    engine.apply(&folder, Tier::Release, &project.name);
    let after = engine.verify(&folder, Tier::Release, &project.name).unwrap();
    assert!(!after.inherited);
    assert!(after.unexpected.is_empty());
    assert!(after.is_conformant());
    let acl = platform.local_acl(&folder).unwrap();
    assert_eq!(acl.len(), 4);
    assert!(acl.iter().all(|ra| ra.principal_id != 999));
}

#[test]
fn test_missing_contributors_team_is_skipped() {
    let (platform, project) = seeded("HTAN2_Ovarian");
    let other = htan2_synapse::types::Project {
        name: "HTAN2_Unknown".into(),
        synapse_id: project.synapse_id.clone(),
    };
    let outcome = Provisioner::new(&platform).provision(&other, &v8(), &[Tier::Ingest]);
    let folder = &outcome.folders.folders["v8_ingest"].synapse_id;

    let grants = PolicyEngine::new(&platform, teams()).apply(folder, Tier::Ingest, &other.name);
    let contributors = grants
        .iter()
        .find(|g| g.principal == Principal::Contributors)
        .unwrap();
    assert!(matches!(contributors.status, GrantStatus::Skipped(_)));
    assert_eq!(
        grants.iter().filter(|g| g.status == GrantStatus::Applied).count(),
        3
    );
}

#[test]
fn test_one_failed_grant_does_not_stop_others() {
    let (platform, project) = seeded("HTAN2_Ovarian");
    let outcome = Provisioner::new(&platform).provision(&project, &v8(), &[Tier::Ingest]);
    let folder = &outcome.folders.folders["v8_ingest"].synapse_id;
    platform.fail_grants_for(teams().operations);

    let grants = PolicyEngine::new(&platform, teams()).apply(folder, Tier::Ingest, &project.name);
    assert_eq!(grants.iter().filter(|g| g.is_failure()).count(), 1);
    assert_eq!(
        grants.iter().filter(|g| g.status == GrantStatus::Applied).count(),
        3
    );
}
