use crate::new_workdir;
use cumulus_core::{
    catalog::{Connection, DatabaseJob, Dbms, FolderJob},
    config::Encryption,
    naming::format_date,
    pipeline::{self, Job},
    prune::Retention,
    tools::{ExitStatus, PriorityHints},
};
use integration_tests::files_below;

fn folder_job(source: &str, excludes: &[&str]) -> FolderJob {
    FolderJob {
        source: source.to_owned(),
        excludes: excludes.iter().map(|s| s.to_string()).collect(),
        retention: Retention::Days(7),
        priority: PriorityHints::default(),
    }
}

fn postgres_job() -> DatabaseJob {
    DatabaseJob {
        name: "orders".to_owned(),
        dbms: Dbms::Postgres,
        connection: Connection {
            user: Some("u".to_owned()),
            password: Some("p".to_owned()),
            port: Some("5432".to_owned()),
            host: Some("localhost".to_owned()),
        },
        retention: Retention::Disabled,
    }
}

fn encrypted() -> Encryption {
    Encryption::Enabled {
        recipient: "backup@example.org".to_owned(),
    }
}

#[tokio::test]
async fn should_archive_folder_into_dated_durable_file() {
    let workdir = new_workdir().with_stdout("tar", "archive");
    let config = workdir.config(false, Encryption::Disabled);
    let job = folder_job("/data/app", &["cache", "tmp"]);

    let report = pipeline::run(&config, Job::Folder(&job)).await;

    assert!(report.combined_ok());
    assert_eq!(report.encrypt, None);
    workdir.args("tar").assert_args(&[
        "--create",
        "--gzip",
        "--preserve-permissions",
        "--file",
        "-",
        "--exclude=cache",
        "--exclude=tmp",
        "/data/app",
    ]);
    let durable_name = format!("app/app_backup_{}.tar.gz", format_date(config.date));
    assert_eq!(files_below(&workdir.durable()), vec![durable_name.clone()]);
    assert_eq!(
        std::fs::read_to_string(workdir.durable().join(durable_name)).unwrap(),
        "archive"
    );
    assert!(files_below(&workdir.local()).is_empty());
    assert!(!workdir.was_run("gpg"));
}

#[tokio::test]
async fn should_not_pass_excludes_if_there_are_none() {
    let workdir = new_workdir();
    let config = workdir.config(false, Encryption::Disabled);

    pipeline::run(&config, Job::Folder(&folder_job("/srv/www/", &[]))).await;

    workdir.args("tar").assert_args(&[
        "--create",
        "--gzip",
        "--preserve-permissions",
        "--file",
        "-",
        "/srv/www/",
    ]);
    assert_eq!(
        files_below(&workdir.durable()),
        vec![format!("www/www_backup_{}.tar.gz", format_date(config.date))]
    );
}

#[tokio::test]
async fn should_encrypt_before_copying() {
    let workdir = new_workdir()
        .with_stdout("tar", "archive")
        .with_stdout("gpg", "ciphertext");
    let config = workdir.config(false, encrypted());

    let report = pipeline::run(&config, Job::Folder(&folder_job("/data/app", &[]))).await;

    assert!(report.combined_ok());
    assert_eq!(report.encrypt, Some(ExitStatus::Successful));
    let local = workdir.local().join("app").join("app_backup.tar.gz");
    workdir.args("gpg").assert_args(&[
        "--batch",
        "--yes",
        "--trust-model",
        "always",
        "--recipient",
        "backup@example.org",
        "--output",
        "-",
        "--encrypt",
        local.to_str().unwrap(),
    ]);
    let durable_name = format!("app/app_backup_{}.tar.gz.gpg", format_date(config.date));
    assert_eq!(files_below(&workdir.durable()), vec![durable_name.clone()]);
    assert_eq!(
        std::fs::read_to_string(workdir.durable().join(durable_name)).unwrap(),
        "ciphertext"
    );
    assert!(files_below(&workdir.local()).is_empty());
}

#[tokio::test]
async fn should_overwrite_stale_local_files() {
    let workdir = new_workdir()
        .with_stdout("tar", "new")
        .with_stdout("gpg", "new-ciphertext");
    let config = workdir.config(false, encrypted());
    let local_dir = workdir.local().join("app");
    std::fs::create_dir_all(&local_dir).unwrap();
    std::fs::write(local_dir.join("app_backup.tar.gz"), "old").unwrap();
    std::fs::write(local_dir.join("app_backup.tar.gz.gpg"), "old-ciphertext").unwrap();

    pipeline::run(&config, Job::Folder(&folder_job("/data/app", &[]))).await;

    let durable = workdir.durable().join(format!(
        "app/app_backup_{}.tar.gz.gpg",
        format_date(config.date)
    ));
    assert_eq!(std::fs::read_to_string(durable).unwrap(), "new-ciphertext");
}

#[tokio::test]
async fn should_fail_relocation_and_store_nothing_if_encryption_fails() {
    let workdir = new_workdir()
        .with_stdout("gpg", "partial-ciphertext")
        .with_exit_status("gpg", 2);
    let config = workdir.config(false, encrypted());

    let report = pipeline::run(&config, Job::Folder(&folder_job("/data/app", &[]))).await;

    assert_eq!(report.encrypt, Some(ExitStatus::Failed(Some(2))));
    assert!(!report.combined_ok());
    assert_eq!(report.archive, ExitStatus::Successful);
    assert_eq!(report.relocate, ExitStatus::IO_FAILURE);
    assert_eq!(report.cleanup, ExitStatus::Successful);
    assert!(files_below(&workdir.durable()).is_empty());
    assert!(files_below(&workdir.local()).is_empty());
}

#[tokio::test]
async fn should_record_directory_creation_failure_as_archive_failure() {
    let workdir = new_workdir();
    std::fs::write(workdir.local().join("app"), "not a directory").unwrap();
    let config = workdir.config(false, Encryption::Disabled);

    let report = pipeline::run(&config, Job::Folder(&folder_job("/data/app", &[]))).await;

    assert_eq!(report.archive, ExitStatus::IO_FAILURE);
    assert!(!report.combined_ok());
    assert!(!workdir.was_run("tar"));
    assert!(files_below(&workdir.durable()).is_empty());
}

#[tokio::test]
async fn should_fail_but_still_clean_up_if_archiving_fails() {
    let workdir = new_workdir()
        .with_stdout("tar", "partial")
        .with_exit_status("tar", 2);
    let config = workdir.config(false, Encryption::Disabled);

    let report = pipeline::run(&config, Job::Folder(&folder_job("/data/app", &[]))).await;

    assert!(!report.combined_ok());
    assert_eq!(report.archive, ExitStatus::Failed(Some(2)));
    assert_eq!(report.relocate, ExitStatus::Successful);
    assert_eq!(report.cleanup, ExitStatus::Successful);
    assert_eq!(
        report.status_line(),
        "FAILED (archive: 2, relocate: 0, cleanup: 0)"
    );
    assert!(files_below(&workdir.local()).is_empty());
}

#[tokio::test]
async fn should_dump_postgres_database_through_gzip() {
    let workdir = new_workdir().with_stdout("pg_dump", "CREATE TABLE orders;");
    let config = workdir.config(false, Encryption::Disabled);
    let job = postgres_job();

    let report = pipeline::run(&config, Job::Database(&job)).await;

    assert!(report.combined_ok());
    workdir.args("pg_dump").assert_args(&[
        "--username",
        "u",
        "--host",
        "localhost",
        "--port",
        "5432",
        "orders",
    ]);
    workdir.env("pg_dump").assert_var("PGPASSWORD", "p");
    workdir.args("gzip").assert_args(&["-c"]);
    let durable_name = format!("db/postgres_db_orders_{}.sql.gz", format_date(config.date));
    assert_eq!(files_below(&workdir.durable()), vec![durable_name.clone()]);
    assert_eq!(
        std::fs::read_to_string(workdir.durable().join(durable_name)).unwrap(),
        "CREATE TABLE orders;"
    );
}

#[tokio::test]
async fn should_dump_mysql_database_with_password_in_environment() {
    let workdir = new_workdir();
    let config = workdir.config(false, Encryption::Disabled);
    let job = DatabaseJob {
        name: "shop".to_owned(),
        dbms: Dbms::MySql,
        connection: Connection {
            user: Some("root".to_owned()),
            password: Some("secret".to_owned()),
            ..Default::default()
        },
        retention: Retention::Days(3),
    };

    let report = pipeline::run(&config, Job::Database(&job)).await;

    assert!(report.combined_ok());
    workdir
        .args("mysqldump")
        .assert_args(&["--user", "root", "--single-transaction", "shop"]);
    workdir
        .env("mysqldump")
        .assert_var("MYSQL_PWD", "secret")
        .assert_no_var("PGPASSWORD");
    assert!(!workdir.was_run("pg_dump"));
    assert!(workdir
        .durable()
        .join(format!("db/mysql_db_shop_{}.sql.gz", format_date(config.date)))
        .is_file());
}

#[tokio::test]
async fn should_fail_dump_if_dump_utility_fails_even_though_gzip_succeeds() {
    let workdir = new_workdir().with_exit_status("pg_dump", 3);
    let config = workdir.config(false, Encryption::Disabled);

    let report = pipeline::run(&config, Job::Database(&postgres_job())).await;

    assert_eq!(report.archive, ExitStatus::Failed(Some(3)));
    assert!(!report.combined_ok());
    assert!(workdir.was_run("gzip"));
}

#[tokio::test]
async fn should_fail_dump_if_gzip_fails() {
    let workdir = new_workdir().with_exit_status("gzip", 1);
    let config = workdir.config(false, Encryption::Disabled);

    let report = pipeline::run(&config, Job::Database(&postgres_job())).await;

    assert_eq!(report.archive, ExitStatus::Failed(Some(1)));
}

#[tokio::test]
async fn should_fail_unknown_dbms_without_running_anything() {
    let workdir = new_workdir();
    let config = workdir.config(false, Encryption::Disabled);
    let job = DatabaseJob {
        dbms: Dbms::Unknown("oracle".to_owned()),
        ..postgres_job()
    };

    let report = pipeline::run(&config, Job::Database(&job)).await;

    assert_eq!(report.archive, ExitStatus::Failed(None));
    assert!(!report.combined_ok());
    assert!(!workdir.was_run("pg_dump"));
    assert!(!workdir.was_run("gzip"));
}

#[tokio::test]
async fn should_write_package_list() {
    let workdir = new_workdir().with_stdout("dpkg", "bash\tinstall\n");
    let config = workdir.config(true, Encryption::Disabled);

    let report = pipeline::run(&config, Job::PackageList).await;

    assert!(report.combined_ok());
    workdir.args("dpkg").assert_args(&["--get-selections"]);
    let durable_name = format!("packageList/packageList_{}.list", format_date(config.date));
    assert_eq!(
        std::fs::read_to_string(workdir.durable().join(durable_name)).unwrap(),
        "bash\tinstall\n"
    );
}

#[tokio::test]
async fn should_never_create_encrypted_files_if_encryption_is_disabled() {
    let workdir = new_workdir();
    let config = workdir.config(true, Encryption::Disabled);

    pipeline::run(&config, Job::Folder(&folder_job("/data/app", &[]))).await;
    pipeline::run(&config, Job::Database(&postgres_job())).await;
    pipeline::run(&config, Job::PackageList).await;

    let files = files_below(&workdir.durable());
    assert_eq!(files.len(), 3);
    assert!(files.iter().all(|f| !f.ends_with(".gpg")));
    assert!(!workdir.was_run("gpg"));
}

#[tokio::test]
async fn should_fail_folder_job_without_name() {
    let workdir = new_workdir();
    let config = workdir.config(false, Encryption::Disabled);

    let report = pipeline::run(&config, Job::Folder(&folder_job("/", &[]))).await;

    assert!(!report.combined_ok());
    assert!(!workdir.was_run("tar"));
}
