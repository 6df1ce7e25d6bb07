use orgdir_core::{import_seed, open_db, open_db_in_memory, SeedData, SeedError, SeedOutcome};
use rusqlite::Connection;
use std::io::Write;

const SEED_JSON: &str = r#"{
    "buildings": [
        {"id": 1, "address": "Tverskaya 1", "latitude": 55.757, "longitude": 37.615},
        {"id": 2, "address": "Nevsky 28", "latitude": 59.935, "longitude": 30.327}
    ],
    "activities": [
        {"id": 3, "name": "Dairy", "parent_id": 1},
        {"id": 1, "name": "Food", "parent_id": null},
        {"id": 2, "name": "Cars", "parent_id": null}
    ],
    "organizations": [
        {"id": 1, "name": "Milk Co", "phone_numbers": ["2-222-222", "3-333-333"], "building_id": 1, "activity_ids": [1, 3, 404]},
        {"id": 2, "name": "Auto Parts", "phone_numbers": [], "building_id": 2, "activity_ids": [2]}
    ]
}"#;

fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}

#[test]
fn imports_seed_file_into_empty_database() {
    let dir = tempfile::tempdir().unwrap();
    let seed_path = dir.path().join("test_data.json");
    let mut file = std::fs::File::create(&seed_path).unwrap();
    file.write_all(SEED_JSON.as_bytes()).unwrap();
    drop(file);

    let data = SeedData::from_json_file(&seed_path).unwrap();
    let mut conn = open_db(dir.path().join("orgdir.db")).unwrap();

    let outcome = import_seed(&mut conn, &data).unwrap();
    assert_eq!(
        outcome,
        SeedOutcome::Imported {
            buildings: 2,
            activities: 3,
            organizations: 2,
        }
    );
    assert_eq!(count(&conn, "buildings"), 2);
    assert_eq!(count(&conn, "activities"), 3);
    assert_eq!(count(&conn, "organizations"), 2);

    let blob: String = conn
        .query_row(
            "SELECT phone_numbers FROM organizations WHERE id = 1;",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(blob, r#"["2-222-222","3-333-333"]"#);
}

#[test]
fn unknown_activity_ids_are_ignored() {
    let data = SeedData::from_json_str(SEED_JSON).unwrap();
    let mut conn = open_db_in_memory().unwrap();
    import_seed(&mut conn, &data).unwrap();

    let mut stmt = conn
        .prepare(
            "SELECT activity_id FROM organization_activities
             WHERE organization_id = 1
             ORDER BY activity_id;",
        )
        .unwrap();
    let linked = stmt
        .query_map([], |row| row.get::<_, i64>(0))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(linked, vec![1, 3]);
}

#[test]
fn import_is_skipped_when_data_exists() {
    let data = SeedData::from_json_str(SEED_JSON).unwrap();
    let mut conn = open_db_in_memory().unwrap();
    conn.execute("INSERT INTO activities (id, name) VALUES (50, 'Existing');", [])
        .unwrap();

    assert_eq!(import_seed(&mut conn, &data).unwrap(), SeedOutcome::Skipped);
    assert_eq!(count(&conn, "activities"), 1);
    assert_eq!(count(&conn, "buildings"), 0);
}

#[test]
fn second_import_is_skipped() {
    let data = SeedData::from_json_str(SEED_JSON).unwrap();
    let mut conn = open_db_in_memory().unwrap();

    assert!(matches!(
        import_seed(&mut conn, &data).unwrap(),
        SeedOutcome::Imported { .. }
    ));
    assert_eq!(import_seed(&mut conn, &data).unwrap(), SeedOutcome::Skipped);
    assert_eq!(count(&conn, "organizations"), 2);
}

#[test]
fn failed_import_rolls_back_everything() {
    let mut data = SeedData::from_json_str(SEED_JSON).unwrap();
    data.organizations[1].building_id = Some(999);
    let mut conn = open_db_in_memory().unwrap();

    let err = import_seed(&mut conn, &data).unwrap_err();
    assert!(matches!(err, SeedError::Db(_)));
    assert_eq!(count(&conn, "buildings"), 0);
    assert_eq!(count(&conn, "organizations"), 0);
}

#[test]
fn missing_seed_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = SeedData::from_json_file(dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, SeedError::Io(_)));
}
