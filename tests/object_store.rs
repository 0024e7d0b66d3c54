use common::pack::PackBuilder;
use common::repo::TestRepo;
use gitread::ErrorKind;
use gitread::GitError;
use gitread::areas::database::Database;
use gitread::artifacts::objects::object::Object;
use gitread::artifacts::objects::object_id::{HashAlgorithm, ObjectId};
use gitread::artifacts::objects::object_type::ObjectType;
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::path::Path;
use std::sync::Arc;

mod common;

#[test]
fn reads_loose_blob_and_caches_it_while_held() -> Result<(), Box<dyn std::error::Error>> {
    let repo = TestRepo::new();
    let oid = repo.write_blob("hello\n");
    let database = repo.database();

    let first = database.load_blob(&oid)?;
    let second = database.load_blob(&oid)?;

    assert_eq!(first.content().as_ref(), b"hello\n");
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(database.stats().reads, 1);
    assert_eq!(database.stats().cache_hits, 1);

    Ok(())
}

#[test]
fn dropped_blobs_are_read_again() -> Result<(), Box<dyn std::error::Error>> {
    let repo = TestRepo::new();
    let oid = repo.write_blob("transient\n");
    let database = repo.database();

    drop(database.load_blob(&oid)?);
    let again = database.load_blob(&oid)?;

    assert_eq!(again.content().as_ref(), b"transient\n");
    assert_eq!(database.stats().reads, 2);

    Ok(())
}

#[test]
fn trees_and_commits_stay_cached() -> Result<(), Box<dyn std::error::Error>> {
    let mut repo = TestRepo::new();
    let commit_oid = repo.commit(&[("a.txt", "a\n")], "Add a");
    let database = repo.database();

    let commit = database.load_commit(&commit_oid)?;
    drop(database.load_tree(commit.tree_oid())?);
    database.load_tree(commit.tree_oid())?;
    database.load_commit(&commit_oid)?;

    assert_eq!(database.stats().reads, 2);
    assert_eq!(database.stats().cache_hits, 2);

    Ok(())
}

#[test]
fn missing_object_is_not_found() {
    let repo = TestRepo::new();
    let oid = TestRepo::object_id("blob", b"never written");

    let error = repo.database().load_blob(&oid).unwrap_err();

    assert_eq!(error.kind(), ErrorKind::ObjectNotFound);
    assert!(error.to_string().contains(&oid.to_string()));
}

#[test]
fn content_that_does_not_match_its_id_is_corrupt() {
    let repo = TestRepo::new();
    let oid = TestRepo::object_id("blob", b"expected\n");
    repo.write_loose_content(&oid, b"blob 9\0tampered\n");

    let error = repo.database().load_blob(&oid).unwrap_err();

    assert_eq!(error.kind(), ErrorKind::CorruptObject);
    assert!(error.to_string().contains("hash mismatch"));
}

#[test]
fn undecodable_loose_file_is_corrupt() {
    let repo = TestRepo::new();
    let oid = TestRepo::object_id("blob", b"x");
    repo.write_loose_file(&oid, b"definitely not zlib");

    let error = repo.database().load_blob(&oid).unwrap_err();

    assert_eq!(error.kind(), ErrorKind::CorruptObject);
    assert!(error.to_string().contains("bad zlib stream"), "{error}");
}

#[rstest]
#[case::missing_size(b"blob\0abc".to_vec())]
#[case::size_mismatch(b"blob 10\0abc".to_vec())]
#[case::unknown_type(b"widget 3\0abc".to_vec())]
fn malformed_loose_header_is_corrupt(#[case] content: Vec<u8>) {
    let repo = TestRepo::new();
    let oid = TestRepo::object_id("blob", b"abc");
    repo.write_loose_content(&oid, &content);

    let error = repo.database().load_blob(&oid).unwrap_err();

    assert_eq!(error.kind(), ErrorKind::CorruptObject);
}

#[test]
fn requesting_the_wrong_type_is_corrupt() {
    let repo = TestRepo::new();
    let oid = repo.write_blob("not a tree");

    let error = repo.database().load_tree(&oid).unwrap_err();

    assert_eq!(error.kind(), ErrorKind::CorruptObject);
    assert!(error.to_string().contains("expected tree, found blob"));
}

#[test]
fn resolves_full_and_delta_entries_from_a_pack() -> Result<(), Box<dyn std::error::Error>> {
    let repo = TestRepo::new();
    let v1 = b"line one\nline two\n".to_vec();
    let v2 = b"line one\nline two\nline three\n".to_vec();
    let v3 = b"line one\nline two\nline three\nline four\n".to_vec();
    let v4 = b"line one\nchanged\n".to_vec();

    let mut pack = PackBuilder::new();
    let base = pack.add_full("blob", &v1);
    let ofs = pack.add_ofs_delta(&base, &v2);
    let chained = pack.add_ofs_delta(&ofs, &v3);
    let by_ref = pack.add_ref_delta(&chained, &v4);
    pack.write_to(&repo.objects_dir().join("pack"));

    let database = repo.database();

    assert_eq!(database.pack_count(), 1);
    assert_eq!(database.load_blob(&base)?.content().as_ref(), &v1[..]);
    assert_eq!(database.load_blob(&ofs)?.content().as_ref(), &v2[..]);
    assert_eq!(database.load_blob(&chained)?.content().as_ref(), &v3[..]);
    assert_eq!(database.load_blob(&by_ref)?.content().as_ref(), &v4[..]);

    Ok(())
}

#[test]
fn ref_delta_base_may_live_outside_the_pack() -> Result<(), Box<dyn std::error::Error>> {
    let repo = TestRepo::new();
    let base_content = b"shared prefix\nloose base\n";
    let base = repo.write_blob(base_content);
    let target_content = b"shared prefix\npacked target\n";

    let mut pack = PackBuilder::new();
    let target = pack.add_external_ref_delta("blob", &base, base_content, target_content);
    pack.write_to(&repo.objects_dir().join("pack"));

    let blob = repo.database().load_blob(&target)?;

    assert_eq!(blob.content().as_ref(), target_content);

    Ok(())
}

#[test]
fn missing_delta_base_is_corrupt_for_the_requested_object() {
    let repo = TestRepo::new();
    let base_content = b"gone\n";
    let base = TestRepo::object_id("blob", base_content);

    let mut pack = PackBuilder::new();
    let target = pack.add_external_ref_delta("blob", &base, base_content, b"gone\nfor good\n");
    pack.write_to(&repo.objects_dir().join("pack"));

    let error = repo.database().load_blob(&target).unwrap_err();

    match error {
        GitError::CorruptObject { oid, reason, .. } => {
            assert_eq!(oid, target);
            assert!(reason.contains(&base.to_string()));
        }
        other => panic!("expected a corrupt object, got {other:?}"),
    }
}

fn assert_corrupt(error: GitError, expected_oid: &ObjectId, reason_part: &str) {
    match error {
        GitError::CorruptObject { oid, reason, .. } => {
            assert_eq!(&oid, expected_oid);
            assert!(reason.contains(reason_part), "{reason}");
        }
        other => panic!("expected a corrupt object, got {other:?}"),
    }
}

#[rstest]
#[case::unknown_type_code(5, 6, "invalid pack entry type 5")]
#[case::short_declared_size(3, 3, "header says 3")]
#[case::huge_declared_size(3, 1 << 50, "header says")]
fn malformed_entry_headers_are_corrupt(
    #[case] code: u8,
    #[case] declared: usize,
    #[case] reason: &str,
) {
    let repo = TestRepo::new();
    let mut pack = PackBuilder::new();
    let oid = pack.add_with_header("blob", b"hello\n", code, declared);
    pack.write_to(&repo.objects_dir().join("pack"));

    let error = repo.database().load_blob(&oid).unwrap_err();

    assert_corrupt(error, &oid, reason);
}

#[test]
fn ofs_delta_reaching_before_the_pack_is_corrupt() {
    let repo = TestRepo::new();
    let mut pack = PackBuilder::new();
    pack.add_full("blob", b"first\n");
    let oid = pack.add_ofs_delta_at("blob", b"second\n", 1_000_000);
    pack.write_to(&repo.objects_dir().join("pack"));

    let error = repo.database().load_blob(&oid).unwrap_err();

    assert_corrupt(error, &oid, "delta base before pack start");
}

#[test]
fn ref_delta_on_itself_stops_at_the_chain_limit() {
    let repo = TestRepo::new();
    let content = b"loop\n";
    let oid = TestRepo::object_id("blob", content);
    let mut pack = PackBuilder::new();
    pack.add_external_ref_delta("blob", &oid, content, content);
    pack.write_to(&repo.objects_dir().join("pack"));

    let error = repo.database().load_blob(&oid).unwrap_err();

    assert_corrupt(error, &oid, "delta chain too long");
}

#[test]
fn ref_delta_cycle_across_packs_is_corrupt() {
    let repo = TestRepo::new();
    let pack_dir = repo.objects_dir().join("pack");
    let (left_content, right_content) = (b"left\n", b"right\n");
    let left = TestRepo::object_id("blob", left_content);
    let right = TestRepo::object_id("blob", right_content);

    let mut first = PackBuilder::new();
    first.add_external_ref_delta("blob", &right, right_content, left_content);
    first.write_to(&pack_dir);
    let mut second = PackBuilder::new();
    second.add_external_ref_delta("blob", &left, left_content, right_content);
    second.write_to(&pack_dir);

    let error = repo.database().load_blob(&left).unwrap_err();

    assert_corrupt(error, &left, "delta chain too long");
}

#[test]
fn oversized_delta_target_is_corrupt() {
    let repo = TestRepo::new();
    let base = b"abc";
    let mut pack = PackBuilder::new();
    let base_oid = pack.add_full("blob", base);
    // declares a target of 2^56 bytes, then inserts one
    let delta = vec![3, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x7f, 1, b'x'];
    let oid = pack.add_ref_delta_bytes("blob", &base_oid, b"x", delta);
    pack.write_to(&repo.objects_dir().join("pack"));

    let error = repo.database().load_blob(&oid).unwrap_err();

    assert_corrupt(error, &oid, "delta produced 1 bytes");
}

#[test]
fn packed_trees_and_commits_decode() -> Result<(), Box<dyn std::error::Error>> {
    let mut repo = TestRepo::new();
    let commit_oid = repo.commit(&[("dir/a.txt", "a\n")], "Packed");
    let loose = repo.database();
    let commit = loose.load_commit(&commit_oid)?;
    let root = loose.load_tree(commit.tree_oid())?;
    let dir_oid = root.entry("dir").expect("dir entry").oid.clone();
    let raw_commit = loose.load_raw(&commit_oid)?;
    let raw_root = loose.load_raw(commit.tree_oid())?;
    let raw_dir = loose.load_raw(&dir_oid)?;

    let mut pack = PackBuilder::new();
    pack.add_full("commit", &raw_commit.payload);
    pack.add_full("tree", &raw_root.payload);
    pack.add_full("tree", &raw_dir.payload);
    pack.write_to(&repo.objects_dir().join("pack"));
    for oid in [&commit_oid, commit.tree_oid(), &dir_oid] {
        repo.remove_loose(oid);
    }

    let database = repo.database();
    let packed_commit = database.load_commit(&commit_oid)?;
    let entry = database.lookup_path(packed_commit.tree_oid(), Path::new("dir/a.txt"))?;

    assert!(matches!(database.resolve(&commit_oid)?, Object::Commit(_)));
    assert_eq!(raw_dir.object_type, ObjectType::Tree);
    assert_eq!(entry.map(|entry| entry.name), Some("a.txt".to_string()));

    Ok(())
}

#[test]
fn loose_objects_shadow_packed_copies() -> Result<(), Box<dyn std::error::Error>> {
    let repo = TestRepo::new();
    let oid = repo.write_blob("both\n");
    let mut pack = PackBuilder::new();
    pack.add_full("blob", b"both\n");
    pack.write_to(&repo.objects_dir().join("pack"));

    let blob = repo.database().load_blob(&oid)?;

    assert_eq!(blob.content().as_ref(), b"both\n");

    Ok(())
}

#[test]
fn objects_are_found_through_alternates() -> Result<(), Box<dyn std::error::Error>> {
    let repo = TestRepo::new();
    let shared = TestRepo::new();
    let oid = shared.write_blob("borrowed\n");
    let info = repo.objects_dir().join("info");
    std::fs::create_dir_all(&info)?;
    std::fs::write(
        info.join("alternates"),
        format!("# shared objects\n{}\n", shared.objects_dir().display()),
    )?;

    let database = Database::open(&repo.objects_dir(), HashAlgorithm::Sha1)?;

    assert_eq!(database.load_blob(&oid)?.content().as_ref(), b"borrowed\n");

    Ok(())
}

#[test]
fn lookup_path_walks_nested_trees() -> Result<(), Box<dyn std::error::Error>> {
    let repo = TestRepo::new();
    let tree = repo.write_snapshot(&[("src/lib.rs", "lib\n"), ("src/bin/main.rs", "main\n")]);
    let database = repo.database();

    let file = database.lookup_path(&tree, Path::new("src/bin/main.rs"))?;
    let dir = database.lookup_path(&tree, Path::new("src/bin"))?;
    let through_file = database.lookup_path(&tree, Path::new("src/lib.rs/nope"))?;
    let missing = database.lookup_path(&tree, Path::new("docs/readme"))?;

    assert!(file.is_some_and(|entry| entry.is_blob()));
    assert!(dir.is_some_and(|entry| entry.is_tree()));
    assert_eq!(through_file, None);
    assert_eq!(missing, None);

    Ok(())
}
