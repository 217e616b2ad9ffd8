use chrono::NaiveDate;
use packstation_core::db::open_db_in_memory;
use packstation_core::{
    ErrorKind, NewAddress, NewPackageSlot, NewStation, ReadService, SearchCriteria,
    SqliteStationRepository, StationError, StationId, StationRepository,
};
use rusqlite::Connection;

struct Fixture {
    karlsruhe: StationId,
    berlin: StationId,
    arlon: StationId,
}

fn station(number: &str, city: &str, built: (i32, u32, u32), slots: usize) -> NewStation {
    let mut station = NewStation::new(number, NewAddress::new("Hauptstr.", "1", "10000", city));
    station.construction_date = NaiveDate::from_ymd_opt(built.0, built.1, built.2);
    for index in 0..slots {
        station
            .slots
            .push(NewPackageSlot::new(format!("{number}-{index}"), 5.0));
    }
    station
}

fn seed(conn: &Connection) -> Fixture {
    let repo = SqliteStationRepository::try_new(conn).unwrap();
    Fixture {
        karlsruhe: repo
            .insert_station(&station("565", "Karlsruhe", (2022, 1, 31), 2))
            .unwrap(),
        berlin: repo
            .insert_station(&station("100", "Berlin", (2019, 6, 1), 0))
            .unwrap(),
        arlon: repo
            .insert_station(&station("200", "ARLON", (2021, 3, 15), 1))
            .unwrap(),
    }
}

fn ids(result: &[packstation_core::Station]) -> Vec<StationId> {
    result.iter().map(|station| station.id).collect()
}

#[test]
fn absent_criteria_return_every_station() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed(&conn);
    let reader = ReadService::new(SqliteStationRepository::try_new(&conn).unwrap());

    let all = reader.find(None).unwrap();
    assert_eq!(
        ids(&all),
        vec![fixture.karlsruhe, fixture.berlin, fixture.arlon]
    );
    assert_eq!(all[0].slots.as_ref().map(Vec::len), Some(2));
    assert_eq!(all[1].slots.as_ref().map(Vec::len), Some(0));
}

#[test]
fn empty_criteria_behave_like_absent_criteria() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let reader = ReadService::new(SqliteStationRepository::try_new(&conn).unwrap());

    assert_eq!(reader.find(Some(&SearchCriteria::new())).unwrap().len(), 3);
}

#[test]
fn empty_store_without_criteria_is_not_an_error() {
    let conn = open_db_in_memory().unwrap();
    let reader = ReadService::new(SqliteStationRepository::try_new(&conn).unwrap());

    assert!(reader.find(None).unwrap().is_empty());
    assert!(reader.find(Some(&SearchCriteria::new())).unwrap().is_empty());
}

#[test]
fn city_matches_case_insensitive_substring() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed(&conn);
    let reader = ReadService::new(SqliteStationRepository::try_new(&conn).unwrap());

    let found = reader
        .find(Some(&SearchCriteria::new().with("stadt", "arl")))
        .unwrap();
    assert_eq!(ids(&found), vec![fixture.karlsruhe, fixture.arlon]);

    let found = reader
        .find(Some(&SearchCriteria::new().with("city", "KARLS")))
        .unwrap();
    assert_eq!(ids(&found), vec![fixture.karlsruhe]);
}

#[test]
fn city_match_folds_non_ascii_letters() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStationRepository::try_new(&conn).unwrap();
    let munich = repo
        .insert_station(&station("300", "München", (2020, 2, 2), 0))
        .unwrap();
    let cologne = repo
        .insert_station(&station("301", "KÖLN", (2020, 2, 2), 0))
        .unwrap();
    let reader = ReadService::new(repo);

    let found = reader
        .find(Some(&SearchCriteria::new().with("stadt", "MÜNCHEN")))
        .unwrap();
    assert_eq!(ids(&found), vec![munich]);
    assert_eq!(found[0].address.city, "München");

    let found = reader
        .find(Some(&SearchCriteria::new().with("city", "köln")))
        .unwrap();
    assert_eq!(ids(&found), vec![cologne]);

    let found = reader
        .find(Some(&SearchCriteria::new().with("stadt", "Ü")))
        .unwrap();
    assert_eq!(ids(&found), vec![munich]);
}

#[test]
fn unmatched_city_is_no_matches() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let reader = ReadService::new(SqliteStationRepository::try_new(&conn).unwrap());

    let criteria = SearchCriteria::new().with("stadt", "xx");
    let err = reader.find(Some(&criteria)).unwrap_err();
    assert!(matches!(&err, StationError::NoMatches { criteria: rejected } if *rejected == criteria));
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn criteria_on_empty_store_is_no_matches() {
    let conn = open_db_in_memory().unwrap();
    let reader = ReadService::new(SqliteStationRepository::try_new(&conn).unwrap());

    let err = reader
        .find(Some(&SearchCriteria::new().with("version", "0")))
        .unwrap_err();
    assert!(matches!(err, StationError::NoMatches { .. }));
}

#[test]
fn unknown_keys_are_rejected_before_querying() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let reader = ReadService::new(SqliteStationRepository::try_new(&conn).unwrap());

    for key in ["preis", "Stadt", "adresse.stadt", "titel"] {
        let criteria = SearchCriteria::new().with("stadt", "arl").with(key, "x");
        let err = reader.find(Some(&criteria)).unwrap_err();
        assert!(
            matches!(&err, StationError::InvalidCriteria { keys } if keys == &vec![key.to_string()]),
            "{key} should be rejected"
        );
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}

#[test]
fn undecodable_values_are_invalid_criteria() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let reader = ReadService::new(SqliteStationRepository::try_new(&conn).unwrap());

    let err = reader
        .find(Some(&SearchCriteria::new().with("baudatum_von", "gestern")))
        .unwrap_err();
    assert!(matches!(err, StationError::InvalidCriteria { keys } if keys == ["baudatum_von"]));
}

#[test]
fn legacy_and_field_keys_are_accepted_and_ignored() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let reader = ReadService::new(SqliteStationRepository::try_new(&conn).unwrap());

    let criteria = SearchCriteria::new()
        .with("bildschirm", "true")
        .with("bluetooth", "false")
        .with("erzeugt", "egal");
    assert_eq!(reader.find(Some(&criteria)).unwrap().len(), 3);
}

#[test]
fn number_is_exact_match() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed(&conn);
    let reader = ReadService::new(SqliteStationRepository::try_new(&conn).unwrap());

    let found = reader
        .find(Some(&SearchCriteria::new().with("nummer", "100")))
        .unwrap();
    assert_eq!(ids(&found), vec![fixture.berlin]);

    assert!(reader
        .find(Some(&SearchCriteria::new().with("nummer", "10")))
        .is_err());
}

#[test]
fn construction_date_bounds_apply_independently() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed(&conn);
    let reader = ReadService::new(SqliteStationRepository::try_new(&conn).unwrap());

    let from = reader
        .find(Some(&SearchCriteria::new().with("baudatum_von", "2021-01-01")))
        .unwrap();
    assert_eq!(ids(&from), vec![fixture.karlsruhe, fixture.arlon]);

    let to = reader
        .find(Some(&SearchCriteria::new().with("baudatum_bis", "2021-03-15")))
        .unwrap();
    assert_eq!(ids(&to), vec![fixture.berlin, fixture.arlon]);

    let both = reader
        .find(Some(
            &SearchCriteria::new()
                .with("baudatum_von", "2020-01-01")
                .with("baudatum_bis", "2021-12-31"),
        ))
        .unwrap();
    assert_eq!(ids(&both), vec![fixture.arlon]);
}

#[test]
fn has_slots_filters_on_slot_existence() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed(&conn);
    let reader = ReadService::new(SqliteStationRepository::try_new(&conn).unwrap());

    let with_slots = reader
        .find(Some(&SearchCriteria::new().with("hat_pakete", "true")))
        .unwrap();
    assert_eq!(ids(&with_slots), vec![fixture.karlsruhe, fixture.arlon]);
    assert_eq!(with_slots[0].slots.as_ref().map(Vec::len), Some(2));

    let without_slots = reader
        .find(Some(&SearchCriteria::new().with("hat_pakete", "false")))
        .unwrap();
    assert_eq!(ids(&without_slots), vec![fixture.berlin]);
}

#[test]
fn all_predicates_combine_conjunctively() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed(&conn);
    let reader = ReadService::new(SqliteStationRepository::try_new(&conn).unwrap());

    let criteria = SearchCriteria::new()
        .with("stadt", "arl")
        .with("hat_pakete", "true")
        .with("baudatum_bis", "2021-12-31");
    assert_eq!(ids(&reader.find(Some(&criteria)).unwrap()), vec![fixture.arlon]);

    let criteria = SearchCriteria::new()
        .with("stadt", "berlin")
        .with("hat_pakete", "true");
    assert!(matches!(
        reader.find(Some(&criteria)),
        Err(StationError::NoMatches { .. })
    ));
}
