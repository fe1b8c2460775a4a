use std::sync::Arc;
use std::thread;

use heapdb::config::DbConfig;
use heapdb::database::Database;
use heapdb::fields::{FieldVal, IntField, StringField};
use heapdb::operators::{Operator, SeqScan};
use heapdb::transaction::TransactionId;
use heapdb::tuple::Tuple;

/// Loads `schemas.txt` next to the binary, inserts a handful of rows into
/// `employees` from three concurrent transactions, then scans the table
/// back out. Demonstrates the public surface; not itself part of the core.
fn main() {
    env_logger::init();

    let dir = std::env::current_dir().unwrap();
    let db = Arc::new(Database::new(DbConfig::default()));
    db.load_schema(&dir.join("schemas.txt"))
        .expect("failed to load schemas.txt");

    let table_id = db
        .get_catalog()
        .table_id_by_name("employees")
        .expect("schemas.txt must declare an 'employees' table");
    let td = db.get_catalog().schema_of(table_id).unwrap();

    let handles: Vec<_> = (0..3)
        .map(|i| {
            let db = Arc::clone(&db);
            let td = td.clone();
            thread::spawn(move || {
                let tid = TransactionId::new();
                let bp = db.get_buffer_pool();
                let name = format!("Employee_{}", i);
                let tuple = Tuple::new(
                    vec![
                        FieldVal::IntField(IntField::new(i)),
                        FieldVal::StringField(StringField::new(name)),
                    ],
                    &td,
                );
                match bp.insert_tuple(tid, table_id, tuple) {
                    Ok(()) => bp.transaction_complete(tid, true).unwrap(),
                    Err(e) => {
                        log::warn!("transaction {:?} aborted: {}", tid, e);
                        bp.transaction_complete(tid, false).unwrap();
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let tid = TransactionId::new();
    let mut scan = SeqScan::new(tid, table_id, "employees", Arc::clone(db.get_catalog()), Arc::clone(db.get_buffer_pool()))
        .unwrap();
    scan.open().unwrap();
    let mut count = 0;
    while scan.has_next().unwrap() {
        println!("{}", scan.next().unwrap());
        count += 1;
    }
    scan.close();
    db.get_buffer_pool().transaction_complete(tid, true).unwrap();

    println!("rows: {}", count);
}
