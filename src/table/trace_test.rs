use std::fmt::Write;

use crate::fs::MockDir;

use super::{tests::Item, RecordTable, TableOptions};

const NAME: &str = "items";

#[test]
fn test_table_trace() {
    datadriven::walk("src/table/testdata/", |f| {
        let dir = MockDir::new();
        let mut table: Option<RecordTable<Item, MockDir>> = None;
        f.run(|test_case| match test_case.directive.as_str() {
            "open" => {
                let options = TableOptions {
                    atomic_flush: test_case.args.contains_key("atomic"),
                    sync_on_flush: !test_case.args.contains_key("no-sync"),
                    ..TableOptions::default()
                };
                // Replacing an open table would flush it on drop.
                assert!(table.is_none(), "table already open");
                match RecordTable::open_in(dir.clone(), NAME, options) {
                    Ok(t) => {
                        let out = format!("len={}\n", t.len());
                        table = Some(t);
                        out
                    }
                    Err(e) => format!("error: {:#}\n", e),
                }
            }
            "upsert" => {
                let t = table.as_mut().unwrap();
                let mut out = String::new();
                for line in test_case.input.lines() {
                    let (name, qty) = line.split_once('=').unwrap();
                    let item = Item::new(name, qty.parse().unwrap());
                    match t.upsert(item, name, Item::by_name) {
                        Some(old) => {
                            let new = t.lookup(name, Item::by_name).unwrap().qty;
                            writeln!(&mut out, "updated {} ({} -> {})", name, old.qty, new).unwrap();
                        }
                        None => writeln!(&mut out, "inserted {}", name).unwrap(),
                    }
                }
                out
            }
            "remove" => {
                let key = &test_case.args.get("key").expect("remove requires key argument")[0];
                let removed = table.as_mut().unwrap().remove(key.as_str(), Item::by_name);
                format!("removed {}\n", removed)
            }
            "sort" => {
                table
                    .as_mut()
                    .unwrap()
                    .sort_by(|a, b| a.name.cmp(&b.name));
                "ok\n".into()
            }
            "scan" => {
                let t = table.as_ref().unwrap();
                if t.is_empty() {
                    return "<empty>\n".into();
                }
                t.records()
                    .iter()
                    .map(|i| format!("{}={}\n", i.name, i.qty))
                    .collect::<Vec<_>>()
                    .join("")
            }
            "flush" => match table.take().unwrap().flush() {
                Ok(()) => "ok\n".into(),
                Err(e) => format!("error: {:#}\n", e),
            },
            "crash" => {
                let ops = test_case
                    .args
                    .get("ops")
                    .expect("crash requires ops argument")[0]
                    .parse()
                    .unwrap();
                (*dir.fs).borrow_mut().schedule_crash(ops);
                "ok\n".into()
            }
            "reboot" => {
                (*dir.fs)
                    .borrow_mut()
                    .reboot(test_case.args.contains_key("power-loss"));
                "ok\n".into()
            }
            "file" => {
                let name = test_case
                    .args
                    .get("name")
                    .map(|v| v[0].as_str())
                    .unwrap_or(NAME);
                match dir.contents(name) {
                    Some(data) => format!("{} bytes\n", data.len()),
                    None => "missing\n".into(),
                }
            }
            "corrupt" => {
                let mut data = dir.contents(NAME).unwrap_or_default();
                data.push(0);
                dir.put(NAME, &data);
                "ok\n".into()
            }
            "trace" => {
                let mut result = String::new();
                for event in (*dir.fs).borrow_mut().take_events() {
                    event.write_abbrev(&mut result).unwrap();
                    result.push('\n');
                }
                if result.is_empty() {
                    "<no events>\n".into()
                } else {
                    result
                }
            }
            _ => {
                panic!("unhandled");
            }
        })
    })
}
