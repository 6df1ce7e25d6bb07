use orgdir_core::seed::{SeedActivity, SeedBuilding, SeedOrganization};
use orgdir_core::{
    import_seed, open_db_in_memory, GeoParamError, GeoRect, GeoSearchParams, LookupError,
    LookupErrorKind, LookupService, NotFoundReason, OrganizationRecord, SeedData,
    SqliteDirectoryRepository,
};
use rusqlite::Connection;

fn building(id: i64, address: &str, latitude: f64, longitude: f64) -> SeedBuilding {
    SeedBuilding {
        id,
        address: address.to_string(),
        latitude,
        longitude,
    }
}

fn activity(id: i64, name: &str, parent_id: Option<i64>) -> SeedActivity {
    SeedActivity {
        id,
        name: name.to_string(),
        parent_id,
    }
}

fn organization(
    id: i64,
    name: &str,
    building_id: i64,
    phone_numbers: &[&str],
    activity_ids: &[i64],
) -> SeedOrganization {
    SeedOrganization {
        id,
        name: name.to_string(),
        phone_numbers: phone_numbers.iter().map(|value| value.to_string()).collect(),
        building_id: Some(building_id),
        activity_ids: activity_ids.to_vec(),
    }
}

/// Taxonomy chain 1 > 2 > 3 > 4 > 5 plus an unrelated root 10.
fn sample_directory() -> SeedData {
    SeedData {
        buildings: vec![
            building(1, "Red Square", 55.75, 37.62),
            building(2, "Equator 10E", 0.0, 10.0),
            building(3, "Null Island", 0.0, 0.0),
        ],
        activities: vec![
            activity(1, "Root", None),
            activity(2, "Child", Some(1)),
            activity(3, "Grandchild", Some(2)),
            activity(4, "Great-grandchild", Some(3)),
            activity(5, "Too deep", Some(4)),
            activity(10, "Food", None),
        ],
        organizations: vec![
            organization(1, "Acme", 1, &["+1-555-0100"], &[10]),
            organization(2, "ACME Corp", 2, &[], &[2]),
            organization(3, "Deep Works", 3, &["1", "2"], &[4]),
            organization(4, "Abyss Ltd", 3, &[], &[5]),
        ],
    }
}

fn seeded_connection(data: &SeedData) -> Connection {
    let mut conn = open_db_in_memory().unwrap();
    import_seed(&mut conn, data).unwrap();
    conn
}

fn ids(records: &[OrganizationRecord]) -> Vec<i64> {
    records.iter().map(|record| record.id).collect()
}

#[test]
fn by_building_returns_full_record_shape() {
    let conn = seeded_connection(&sample_directory());
    let service = LookupService::new(SqliteDirectoryRepository::try_new(&conn).unwrap());

    let records = service.by_building(1).unwrap();
    assert_eq!(
        records,
        vec![OrganizationRecord {
            id: 1,
            name: "Acme".to_string(),
            phone_numbers: vec!["+1-555-0100".to_string()],
            activities: vec!["Food".to_string()],
            address: "Red Square".to_string(),
            latitude: 55.75,
            longitude: 37.62,
        }]
    );
}

#[test]
fn by_building_distinguishes_unknown_building_from_empty_building() {
    let mut data = sample_directory();
    data.buildings.push(building(4, "Empty", 1.0, 1.0));
    let conn = seeded_connection(&data);
    let service = LookupService::new(SqliteDirectoryRepository::try_new(&conn).unwrap());

    assert_eq!(
        service.by_building(999).unwrap_err(),
        LookupError::NotFound(NotFoundReason::BuildingNotFound(999))
    );
    assert_eq!(
        service.by_building(4).unwrap_err(),
        LookupError::NotFound(NotFoundReason::NoOrganizations)
    );
}

#[test]
fn by_activity_matches_exact_activity_only() {
    let conn = seeded_connection(&sample_directory());
    let service = LookupService::new(SqliteDirectoryRepository::try_new(&conn).unwrap());

    assert_eq!(ids(&service.by_activity(2).unwrap()), vec![2]);
    assert_eq!(
        service.by_activity(1).unwrap_err(),
        LookupError::NotFound(NotFoundReason::NoOrganizations)
    );
    assert_eq!(
        service.by_activity(77).unwrap_err(),
        LookupError::NotFound(NotFoundReason::ActivityNotFound(77))
    );
}

#[test]
fn by_activity_tree_includes_three_levels_and_excludes_the_fourth() {
    let conn = seeded_connection(&sample_directory());
    let service = LookupService::new(SqliteDirectoryRepository::try_new(&conn).unwrap());

    let records = service.by_activity_tree(1).unwrap();
    assert_eq!(ids(&records), vec![2, 3]);

    assert_eq!(ids(&service.by_activity_tree(2).unwrap()), vec![2, 3, 4]);
}

#[test]
fn by_activity_tree_of_leaf_matches_by_activity() {
    let conn = seeded_connection(&sample_directory());
    let service = LookupService::new(SqliteDirectoryRepository::try_new(&conn).unwrap());

    assert_eq!(service.by_activity_tree(10).unwrap(), service.by_activity(10).unwrap());
    assert_eq!(
        service.by_activity_tree(77).unwrap_err(),
        LookupError::NotFound(NotFoundReason::ActivityNotFound(77))
    );
}

#[test]
fn organization_with_several_matching_activities_is_listed_once() {
    let mut data = sample_directory();
    data.organizations
        .push(organization(5, "Multi", 1, &[], &[2, 3, 4]));
    let conn = seeded_connection(&data);
    let service = LookupService::new(SqliteDirectoryRepository::try_new(&conn).unwrap());

    let records = service.by_activity_tree(1).unwrap();
    assert_eq!(ids(&records), vec![2, 3, 5]);
    assert_eq!(
        records[2].activities,
        vec![
            "Child".to_string(),
            "Grandchild".to_string(),
            "Great-grandchild".to_string()
        ]
    );
}

#[test]
fn radius_search_uses_great_circle_distance() {
    let conn = seeded_connection(&sample_directory());
    let service = LookupService::new(SqliteDirectoryRepository::try_new(&conn).unwrap());

    let records = service.by_radius(0.0, 0.0, 500.0).unwrap();
    assert_eq!(ids(&records), vec![3, 4]);

    let wide = service.by_radius(0.0, 0.0, 1200.0).unwrap();
    assert_eq!(ids(&wide), vec![2, 3, 4]);
}

#[test]
fn zero_radius_matches_only_the_center_building() {
    let conn = seeded_connection(&sample_directory());
    let service = LookupService::new(SqliteDirectoryRepository::try_new(&conn).unwrap());

    assert_eq!(ids(&service.by_radius(55.75, 37.62, 0.0).unwrap()), vec![1]);
    assert_eq!(
        service.by_radius(55.76, 37.62, 0.0).unwrap_err(),
        LookupError::NotFound(NotFoundReason::NoBuildingsInArea)
    );
}

#[test]
fn rectangle_search_is_inclusive_and_point_sized_rectangles_work() {
    let conn = seeded_connection(&sample_directory());
    let service = LookupService::new(SqliteDirectoryRepository::try_new(&conn).unwrap());

    let strip = service
        .by_rectangle(GeoRect {
            min_lat: 0.0,
            max_lat: 0.0,
            min_lon: 0.0,
            max_lon: 10.0,
        })
        .unwrap();
    assert_eq!(ids(&strip), vec![2, 3, 4]);

    let point = service
        .by_rectangle(GeoRect {
            min_lat: 55.75,
            max_lat: 55.75,
            min_lon: 37.62,
            max_lon: 37.62,
        })
        .unwrap();
    assert_eq!(ids(&point), vec![1]);
}

#[test]
fn rectangle_search_does_not_wrap_the_antimeridian() {
    let conn = seeded_connection(&sample_directory());
    let service = LookupService::new(SqliteDirectoryRepository::try_new(&conn).unwrap());

    let err = service
        .by_rectangle(GeoRect {
            min_lat: -90.0,
            max_lat: 90.0,
            min_lon: 170.0,
            max_lon: -170.0,
        })
        .unwrap_err();
    assert_eq!(err, LookupError::NotFound(NotFoundReason::NoBuildingsInArea));
}

#[test]
fn invalid_location_params_are_bad_requests() {
    let conn = seeded_connection(&sample_directory());
    let service = LookupService::new(SqliteDirectoryRepository::try_new(&conn).unwrap());

    let mut mixed = GeoSearchParams::radius(0.0, 0.0, 10.0);
    mixed.min_lat = Some(0.0);
    let err = service.by_location(&mixed).unwrap_err();
    assert_eq!(err, LookupError::from(GeoParamError::RectangleBoundsWithRadius));
    assert_eq!(err.kind(), LookupErrorKind::BadRequest);

    let unknown = GeoSearchParams {
        search_type: "circle".to_string(),
        ..GeoSearchParams::default()
    };
    assert_eq!(
        service.by_location(&unknown).unwrap_err().kind().status_code(),
        400
    );
}

#[test]
fn by_name_is_case_insensitive_substring() {
    let conn = seeded_connection(&sample_directory());
    let service = LookupService::new(SqliteDirectoryRepository::try_new(&conn).unwrap());

    assert_eq!(ids(&service.by_name("acme").unwrap()), vec![1, 2]);
    assert_eq!(ids(&service.by_name("CORP").unwrap()), vec![2]);
    assert_eq!(ids(&service.by_name("").unwrap()), vec![1, 2, 3, 4]);
    assert_eq!(
        service.by_name("nobody").unwrap_err(),
        LookupError::NotFound(NotFoundReason::NoOrganizations)
    );
}

#[test]
fn by_name_treats_like_wildcards_literally() {
    let mut data = sample_directory();
    data.organizations
        .push(organization(5, "100% Juice", 1, &[], &[]));
    let conn = seeded_connection(&data);
    let service = LookupService::new(SqliteDirectoryRepository::try_new(&conn).unwrap());

    assert_eq!(ids(&service.by_name("0%").unwrap()), vec![5]);
    assert!(service.by_name("_").is_err());
}

#[test]
fn by_id_returns_record_or_not_found() {
    let conn = seeded_connection(&sample_directory());
    let service = LookupService::new(SqliteDirectoryRepository::try_new(&conn).unwrap());

    let record = service.by_id(3).unwrap();
    assert_eq!(record.name, "Deep Works");
    assert_eq!(record.phone_numbers, vec!["1".to_string(), "2".to_string()]);
    assert_eq!(record.activities, vec!["Great-grandchild".to_string()]);
    assert_eq!(record.address, "Null Island");

    assert_eq!(
        service.by_id(404).unwrap_err(),
        LookupError::NotFound(NotFoundReason::OrganizationNotFound(404))
    );
}

#[test]
fn null_phone_blob_reads_as_empty_list() {
    let conn = seeded_connection(&sample_directory());
    conn.execute("UPDATE organizations SET phone_numbers = NULL WHERE id = 1;", [])
        .unwrap();
    let service = LookupService::new(SqliteDirectoryRepository::try_new(&conn).unwrap());

    assert!(service.by_id(1).unwrap().phone_numbers.is_empty());
}

#[test]
fn corrupt_rows_surface_as_store_errors_and_release_the_read_scope() {
    let conn = seeded_connection(&sample_directory());
    conn.execute(
        "UPDATE organizations SET phone_numbers = 'not json' WHERE id = 1;",
        [],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO organizations (id, name, phone_numbers, building_id)
         VALUES (9, 'Homeless', '[]', NULL);",
        [],
    )
    .unwrap();
    let service = LookupService::new(SqliteDirectoryRepository::try_new(&conn).unwrap());

    let err = service.by_building(1).unwrap_err();
    assert_eq!(err, LookupError::Store);
    assert_eq!(err.kind().status_code(), 500);
    assert!(conn.is_autocommit());

    assert_eq!(service.by_id(9).unwrap_err(), LookupError::Store);
    assert!(conn.is_autocommit());

    assert_eq!(ids(&service.by_building(3).unwrap()), vec![3, 4]);
}

#[test]
fn organizations_without_building_are_skipped_in_lists() {
    let conn = seeded_connection(&sample_directory());
    conn.execute(
        "INSERT INTO organizations (id, name, phone_numbers, building_id)
         VALUES (9, 'Acme Ghost', '[]', NULL);",
        [],
    )
    .unwrap();
    let service = LookupService::new(SqliteDirectoryRepository::try_new(&conn).unwrap());

    assert_eq!(ids(&service.by_name("acme").unwrap()), vec![1, 2]);
}

#[test]
fn repository_rejects_unmigrated_connection() {
    let conn = Connection::open_in_memory().unwrap();
    assert!(SqliteDirectoryRepository::try_new(&conn).is_err());
}
