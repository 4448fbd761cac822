//! Loading connection options from JSON files.

use std::io::Write;

use sql_compose::prelude::*;
use sql_compose::test_utils::ScriptedDriver;

#[test]
fn options_from_file_drive_the_connection() -> Result<(), Box<dyn std::error::Error>> {
    let mut file = tempfile::NamedTempFile::new()?;
    write!(
        file,
        r##"{{ "database_type": "postgres", "bind_marker": "#", "table_prefix": "p_" }}"##
    )?;

    let options = ConnectionOptions::from_json_file(file.path())?;
    assert_eq!(options.database_type, DatabaseType::Postgres);

    let mut conn = Connection::new(ScriptedDriver::new(options.database_type), options);
    conn.query("SELECT * FROM p_t WHERE ok = #", vec![RowValues::Bool(true)]);
    assert_eq!(conn.driver().executed(), ["SELECT * FROM p_t WHERE ok = TRUE"]);
    assert_eq!(conn.prefix_table("t"), "p_t");
    Ok(())
}

#[test]
fn missing_files_are_io_errors_and_invalid_files_config_errors()
-> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let missing = dir.path().join("nope.json");
    match ConnectionOptions::from_json_file(&missing) {
        Err(SqlComposeError::Io(err)) => assert_eq!(err.kind(), std::io::ErrorKind::NotFound),
        other => panic!("expected an io error, got {other:?}"),
    }

    let broken = dir.path().join("broken.json");
    std::fs::write(&broken, "{ not json")?;
    assert!(matches!(
        ConnectionOptions::from_json_file(&broken),
        Err(SqlComposeError::ConfigError(_))
    ));
    Ok(())
}
