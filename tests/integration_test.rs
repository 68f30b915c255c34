use std::io::Write;

use assert_cmd::Command;
use predicates as pred;
use predicates::prelude::*;
use tempfile::NamedTempFile;

#[test]
fn end_to_end_outputs_expected_balances() {
    // ama: 50000 in, 10000 sent to kofi, 10000 withdrawn (200 fee)
    // the self-transfer and the oversized withdrawal are rejected
    let mut file = NamedTempFile::new().expect("create temp file");
    writeln!(
        file,
        "type, user, counterparty, amount, description\n\
    signup, ama, +22890000001, ,\n\
    signup, kofi, +22890000002, ,\n\
    deposit, ama, , 50000, salary\n\
    transfer, ama, +22890000002, 10000, rent\n\
    withdraw, ama, , 10000,\n\
    transfer, ama, +22890000001, 5,\n\
    withdraw, ama, , 999999,\n\
    refund, ama, , 10,"
    )
    .unwrap();

    let exe = env!("CARGO_BIN_EXE_wallet_ledger");
    let mut cmd = Command::new(exe);
    cmd.arg(file.path());

    cmd.assert()
        .success()
        .stdout(pred::str::contains("account,user,balance,suspended,platform"))
        .stdout(pred::str::contains("1,platform,200.00,false,true"))
        .stdout(pred::str::contains("2,ama,30000.00,false,false"))
        .stdout(pred::str::contains("3,kofi,10000.00,false,false"))
        .stdout(pred::str::contains("total_fees,200.00"))
        .stdout(pred::str::contains("total_volume,69800.00"));
}

#[test]
fn suspended_accounts_are_reported_and_frozen() {
    let mut file = NamedTempFile::new().expect("create temp file");
    writeln!(
        file,
        "type, user, counterparty, amount, description\n\
    signup, ama, +22890000001, ,\n\
    signup, kofi, +22890000002, ,\n\
    deposit, ama, , 100,\n\
    suspend, kofi, , ,\n\
    transfer, ama, +22890000002, 40,\n\
    suspend, platform, , ,"
    )
    .unwrap();

    let mut cmd = Command::new(env!("CARGO_BIN_EXE_wallet_ledger"));
    cmd.arg(file.path());

    cmd.assert()
        .success()
        .stdout(pred::str::contains("1,platform,0.00,false,true"))
        .stdout(pred::str::contains("2,ama,100.00,false,false"))
        .stdout(pred::str::contains("3,kofi,0.00,true,false"))
        .stdout(pred::str::contains("total_volume,100.00"));
}

#[test]
fn fee_percentage_comes_from_config_file() {
    let mut operations = NamedTempFile::new().expect("create temp file");
    writeln!(
        operations,
        "type, user, counterparty, amount, description\n\
    signup, ama, +22890000001, ,\n\
    deposit, ama, , 1000,\n\
    withdraw, ama, , 1000,"
    )
    .unwrap();

    let mut config = NamedTempFile::new().expect("create temp file");
    write!(config, r#"{{ "fee_percentage": "5", "log_level": "warn" }}"#).unwrap();

    let mut cmd = Command::new(env!("CARGO_BIN_EXE_wallet_ledger"));
    cmd.arg(operations.path()).arg(config.path());

    cmd.assert()
        .success()
        .stdout(pred::str::contains("1,platform,50.00,false,true"))
        .stdout(pred::str::contains("2,ama,0.00,false,false"))
        .stdout(pred::str::contains("total_fees,50.00"));
}

#[test]
fn missing_arguments_print_usage() {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_wallet_ledger"));

    cmd.assert()
        .failure()
        .code(2)
        .stderr(pred::str::contains("usage").and(pred::str::contains("operations.csv")));
}
