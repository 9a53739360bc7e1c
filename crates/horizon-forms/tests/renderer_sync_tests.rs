//! Tests for keeping records and widgets synchronized across screens.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use horizon_forms::prelude::*;

// ============================================================================
// Test doubles
// ============================================================================

/// A passive text-field double.
///
/// `type_in` behaves like a user edit. With `echo_initial` set, the widget
/// also reports programmatic initial values, like toolkits that cannot tell
/// the two apart.
struct TextField {
    item: String,
    value: Mutex<ItemValue>,
    invalid: AtomicBool,
    visible: AtomicBool,
    edit_allowed: AtomicBool,
    mandatory: AtomicBool,
    echo_initial: bool,
    listener: Mutex<Option<Weak<dyn ScreenItemListener>>>,
}

impl TextField {
    fn new(item: &str, echo_initial: bool) -> Self {
        Self {
            item: item.to_string(),
            value: Mutex::new(ItemValue::Null),
            invalid: AtomicBool::new(false),
            visible: AtomicBool::new(false),
            edit_allowed: AtomicBool::new(false),
            mandatory: AtomicBool::new(false),
            echo_initial,
            listener: Mutex::new(None),
        }
    }

    fn type_in(&self, value: impl Into<ItemValue>) {
        self.set_value(value.into());
    }

    fn notify(&self, value: ItemValue) {
        let listener = self.listener.lock().as_ref().and_then(Weak::upgrade);
        if let Some(listener) = listener {
            listener.item_value_changed(&self.item, value);
        }
    }

    fn focus(&self) {
        let listener = self.listener.lock().as_ref().and_then(Weak::upgrade);
        if let Some(listener) = listener {
            listener.focus_gained(&self.item);
        }
    }

    fn blur(&self) {
        let listener = self.listener.lock().as_ref().and_then(Weak::upgrade);
        if let Some(listener) = listener {
            listener.focus_lost(&self.item);
        }
    }

    fn is_invalid(&self) -> bool {
        self.invalid.load(Ordering::SeqCst)
    }
}

impl ItemRenderer for TextField {
    fn item_name(&self) -> &str {
        &self.item
    }

    fn set_value(&self, value: ItemValue) {
        *self.value.lock() = value.clone();
        self.notify(value);
    }

    fn set_initial_value(&self, value: ItemValue) {
        *self.value.lock() = value.clone();
        if self.echo_initial {
            self.notify(value);
        }
    }

    fn value(&self) -> ItemValue {
        self.value.lock().clone()
    }

    fn set_visible(&self, visible: bool) {
        self.visible.store(visible, Ordering::SeqCst);
    }

    fn set_edit_allowed(&self, allowed: bool) {
        self.edit_allowed.store(allowed, Ordering::SeqCst);
    }

    fn set_mandatory(&self, mandatory: bool) {
        self.mandatory.store(mandatory, Ordering::SeqCst);
    }

    fn validation_error_occurred(&self, invalid: bool) {
        self.invalid.store(invalid, Ordering::SeqCst);
    }

    fn set_listener(&self, listener: Option<Weak<dyn ScreenItemListener>>) {
        *self.listener.lock() = listener;
    }
}

/// Every widget the registry created, by screen and item.
#[derive(Clone, Default)]
struct Widgets(Arc<Mutex<Vec<(ScreenType, Arc<TextField>)>>>);

impl Widgets {
    fn get(&self, screen: ScreenType, item: &str) -> Arc<TextField> {
        self.0
            .lock()
            .iter()
            .rev()
            .find(|(s, w)| *s == screen && w.item == item)
            .map(|(_, w)| w.clone())
            .unwrap()
    }
}

/// Rejects negative salaries. On salary edits it also recomputes the bonus,
/// and rejects when the bonus would exceed the limit.
#[derive(Default)]
struct PayrollRules {
    validations: AtomicUsize,
    screens: Mutex<Vec<ScreenType>>,
}

impl ActionProcessor for PayrollRules {
    fn validate_item(
        &self,
        candidate: &DataRecord,
        item_name: &str,
        screen: ScreenType,
    ) -> Result<(), Rejection> {
        self.validations.fetch_add(1, Ordering::SeqCst);
        self.screens.lock().push(screen);

        if item_name != "salary" {
            return Ok(());
        }
        let salary = candidate
            .value("salary")
            .ok()
            .and_then(|v| v.as_int())
            .unwrap_or_default();
        if salary < 0 {
            return Err(Rejection::new("Salary cannot be negative"));
        }
        let bonus = salary / 10;
        if bonus > 500 {
            return Err(Rejection::new("Bonus limit exceeded"));
        }
        candidate
            .set_value("bonus", bonus)
            .map_err(|err| Rejection::new(err.to_string()))
    }
}

const EMP_FORM: &str = r#"
name = "payroll"

[[blocks]]
name = "emp"

[[blocks.items]]
name = "name"

[[blocks.items]]
name = "salary"
data_type = "integer"

[[blocks.items]]
name = "bonus"
data_type = "integer"

[[blocks.items]]
name = "comment"

[[blocks.main_screen]]
item = "name"
mandatory = true

[[blocks.main_screen]]
item = "salary"

[[blocks.main_screen]]
item = "bonus"
edit_allowed = false

[[blocks.update_screen]]
item = "name"

[[blocks.update_screen]]
item = "salary"

[[blocks.insert_screen]]
item = "name"

[[blocks.insert_screen]]
item = "salary"

[[blocks.query_screen]]
item = "name"
renderer = "echo"
"#;

struct Session {
    form: DataForm,
    block: Arc<DataBlock>,
    rules: Arc<PayrollRules>,
    widgets: Widgets,
    registry: RendererRegistry,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn session() -> Session {
    init_tracing();

    let rules = Arc::new(PayrollRules::default());
    let form = DataForm::with_processor(
        FormDefinition::from_toml_str(EMP_FORM).unwrap(),
        rules.clone(),
    )
    .unwrap();
    let block = form.block("emp").unwrap();

    let widgets = Widgets::default();
    let mut registry = RendererRegistry::new();
    for (id, echo_initial) in [("text", false), ("echo", true)] {
        let created = widgets.clone();
        registry.register(id, move |item, _screen_item| {
            let field = Arc::new(TextField::new(&item.name, echo_initial));
            // Screen type is filled in by the register helpers below.
            created.0.lock().push((ScreenType::Main, field.clone()));
            field as Arc<dyn ItemRenderer>
        });
    }

    Session {
        form,
        block,
        rules,
        widgets,
        registry,
    }
}

impl Session {
    /// Tag widgets created since `before` with `screen`.
    fn tag(&self, before: usize, screen: ScreenType) {
        for entry in self.widgets.0.lock().iter_mut().skip(before) {
            entry.0 = screen;
        }
    }

    fn main(&self) -> MainScreenRegister {
        let before = self.widgets.0.lock().len();
        let main = MainScreenRegister::new(self.block.clone(), &self.registry).unwrap();
        self.tag(before, ScreenType::Main);
        main
    }

    fn update(&self) -> UpdateScreenRegister {
        let before = self.widgets.0.lock().len();
        let update = UpdateScreenRegister::new(self.block.clone(), &self.registry).unwrap();
        self.tag(before, ScreenType::Update);
        update
    }

    fn insert(&self) -> InsertScreenRegister {
        let before = self.widgets.0.lock().len();
        let insert = InsertScreenRegister::new(self.block.clone(), &self.registry).unwrap();
        self.tag(before, ScreenType::Insert);
        insert
    }

    fn query(&self) -> QueryScreenRegister {
        let before = self.widgets.0.lock().len();
        let query = QueryScreenRegister::new(self.block.clone(), &self.registry).unwrap();
        self.tag(before, ScreenType::Query);
        query
    }

    fn widget(&self, screen: ScreenType, item: &str) -> Arc<TextField> {
        self.widgets.get(screen, item)
    }

    fn employee(&self, name: &str, salary: i64) -> RecordRef {
        let record = self.block.create_record().unwrap();
        record.set_value("name", name).unwrap();
        record.set_value("salary", salary).unwrap();
        self.block.add_queried_record(record.clone()).unwrap();
        record
    }
}

// ============================================================================
// Main screen
// ============================================================================

#[test]
fn test_screen_definition_applied_to_widgets() {
    let s = session();
    let _main = s.main();

    let name = s.widget(ScreenType::Main, "name");
    let bonus = s.widget(ScreenType::Main, "bonus");
    assert!(name.visible.load(Ordering::SeqCst));
    assert!(name.mandatory.load(Ordering::SeqCst));
    assert!(name.edit_allowed.load(Ordering::SeqCst));
    assert!(!bonus.edit_allowed.load(Ordering::SeqCst));
}

#[test]
fn test_register_leaves_no_stale_values() {
    let s = session();
    let main = s.main();
    let a = s.employee("A", 100);
    let b = s.block.create_record().unwrap();
    b.set_value("name", "B").unwrap();
    s.block.add_queried_record(b.clone()).unwrap();
    a.set_value("bonus", 7).unwrap();

    main.show(&a).unwrap();
    main.show(&b).unwrap();

    for item in ["name", "salary", "bonus"] {
        assert_eq!(
            s.widget(ScreenType::Main, item).value(),
            b.value(item).unwrap(),
            "widget {item} kept a value from the previous record"
        );
    }
    assert_eq!(s.widget(ScreenType::Main, "salary").value(), ItemValue::Null);
}

#[test]
fn test_accepted_edit_updates_record() {
    let s = session();
    let main = s.main();
    let record = s.employee("Ada", 1000);
    main.show(&record).unwrap();

    s.widget(ScreenType::Main, "name").type_in("X");

    assert_eq!(record.value("name").unwrap(), ItemValue::from("X"));
    assert!(!s.widget(ScreenType::Main, "name").is_invalid());
    assert!(record.is_marked_for_update());
    assert!(s.block.is_dirty());
    assert_eq!(*s.rules.screens.lock(), vec![ScreenType::Main]);
}

#[test]
fn test_rejected_edit_leaves_record_unchanged() {
    let s = session();
    let main = s.main();
    let record = s.employee("Ada", 1000);
    main.show(&record).unwrap();

    s.widget(ScreenType::Main, "salary").type_in(-1);

    assert_eq!(record.value("salary").unwrap(), ItemValue::from(1000));
    assert!(s.widget(ScreenType::Main, "salary").is_invalid());
    assert!(!s.block.is_dirty());
    assert!(!main.register().is_changed());
}

#[test]
fn test_multi_item_edit_is_atomic() {
    let s = session();
    let main = s.main();
    let record = s.employee("Ada", 1000);
    main.show(&record).unwrap();

    s.widget(ScreenType::Main, "salary").type_in(2000);
    assert_eq!(record.value("salary").unwrap(), ItemValue::from(2000));
    assert_eq!(record.value("bonus").unwrap(), ItemValue::from(200));
    assert_eq!(s.widget(ScreenType::Main, "bonus").value(), ItemValue::from(200));

    // The candidate gets a bonus above the limit: nothing is applied.
    s.widget(ScreenType::Main, "salary").type_in(9000);
    assert_eq!(record.value("salary").unwrap(), ItemValue::from(2000));
    assert_eq!(record.value("bonus").unwrap(), ItemValue::from(200));
    assert!(s.widget(ScreenType::Main, "salary").is_invalid());
}

#[test]
fn test_item_committed_fires_once_per_edit() {
    let s = session();
    let main = s.main();
    let record = s.employee("Ada", 1000);
    main.show(&record).unwrap();

    let commits = Arc::new(Mutex::new(Vec::new()));
    let log = commits.clone();
    main.register()
        .item_committed()
        .connect(move |(record, item): &(RecordRef, String)| {
            log.lock().push((record.id(), item.clone()));
        });

    s.widget(ScreenType::Main, "salary").type_in(1500);
    s.widget(ScreenType::Main, "salary").type_in(-5);

    assert_eq!(*commits.lock(), vec![(record.id(), "salary".to_string())]);
}

#[test]
fn test_programmatic_writes_do_not_reenter_validation() {
    let s = session();
    let query = s.query();
    let criteria = query.open().unwrap();
    let register = query.register();
    let echo = s.widget(ScreenType::Query, "name");

    let before = s.rules.validations.load(Ordering::SeqCst);
    register.set_item_value_no_validate("name", "A%").unwrap();
    criteria.set_value("name", "B%").unwrap();
    register.refresh_after_change(&criteria);

    assert_eq!(s.rules.validations.load(Ordering::SeqCst), before);
    assert_eq!(echo.value(), ItemValue::from("B%"));
    assert_eq!(register.write_state(), WriteState::Idle);

    // A real edit still validates.
    echo.type_in("C%");
    assert_eq!(s.rules.validations.load(Ordering::SeqCst), before + 1);
    assert_eq!(criteria.value("name").unwrap(), ItemValue::from("C%"));
}

#[test]
fn test_silent_widget_change_is_reconciled() {
    let s = session();
    let main = s.main();
    let record = s.employee("Ada", 1000);
    main.show(&record).unwrap();

    *s.widget(ScreenType::Main, "name").value.lock() = ItemValue::from("Typed");
    let registered = main.register().registered_record().unwrap();

    assert!(Arc::ptr_eq(&registered, &record));
    assert_eq!(record.value("name").unwrap(), ItemValue::from("Typed"));
}

#[test]
fn test_focus_routes_to_block() {
    let s = session();
    let _main = s.main();
    assert!(s.form.focused_block().is_none());

    s.widget(ScreenType::Main, "name").focus();
    assert_eq!(s.form.focused_block().unwrap().name(), "emp");

    s.widget(ScreenType::Main, "name").blur();
    assert!(s.form.focused_block().is_none());
}

// ============================================================================
// Popups
// ============================================================================

#[test]
fn test_update_popup_merges_on_commit() {
    let s = session();
    let main = s.main();
    let update = s.update();
    let record = s.employee("Ada", 1000);
    main.show(&record).unwrap();

    update.open(&record).unwrap();
    assert_eq!(s.widget(ScreenType::Update, "name").value(), ItemValue::from("Ada"));

    s.widget(ScreenType::Update, "name").type_in("Ada Lovelace");
    assert_eq!(record.value("name").unwrap(), ItemValue::from("Ada"));
    assert!(!s.block.is_dirty());
    assert_eq!(s.rules.screens.lock().last(), Some(&ScreenType::Update));

    assert_eq!(update.commit().unwrap(), 1);
    assert_eq!(record.value("name").unwrap(), ItemValue::from("Ada Lovelace"));
    assert_eq!(
        s.widget(ScreenType::Main, "name").value(),
        ItemValue::from("Ada Lovelace")
    );
    assert!(record.is_marked_for_update());
    assert!(s.block.is_dirty());
    assert_eq!(s.widget(ScreenType::Update, "name").value(), ItemValue::Null);
}

#[test]
fn test_update_popup_cancel_discards() {
    let s = session();
    let update = s.update();
    let record = s.employee("Ada", 1000);

    update.open(&record).unwrap();
    s.widget(ScreenType::Update, "salary").type_in(1);
    update.cancel();

    assert_eq!(record.value("salary").unwrap(), ItemValue::from(1000));
    assert!(!s.block.is_dirty());
}

#[test]
fn test_insert_popup_creates_record() {
    let s = session();
    let insert = s.insert();
    let first = s.employee("Existing", 1);

    insert.open().unwrap();
    s.widget(ScreenType::Insert, "name").type_in("Newcomer");
    s.widget(ScreenType::Insert, "salary").type_in(500);
    assert_eq!(s.block.record_count(), 1);

    let record = insert.insert(Some(&first)).unwrap().unwrap();
    assert_eq!(s.block.index_of(&record), Some(1));
    assert_eq!(record.value("bonus").unwrap(), ItemValue::from(50));
    assert!(record.is_marked_for_insert());
    assert!(!record.is_marked_for_update());
    assert!(s.block.is_dirty());
    assert_eq!(s.block.inserted_records().len(), 1);
}

#[test]
fn test_main_screen_follows_deletes() {
    let s = session();
    let main = s.main();
    let records = [s.employee("a", 1), s.employee("b", 2)];

    main.show(&records[0]).unwrap();
    s.block.record_deleted(&records[0]).unwrap();
    assert!(main.register().registered_record().is_none());
    assert_eq!(s.widget(ScreenType::Main, "name").value(), ItemValue::Null);

    assert!(Arc::ptr_eq(&main.show_first().unwrap(), &records[1]));
    assert_eq!(s.widget(ScreenType::Main, "name").value(), ItemValue::from("b"));
}

#[test]
fn test_update_popup_follows_base_edited_on_main_screen() {
    let s = session();
    let main = s.main();
    let update = s.update();
    let record = s.employee("Ada", 1000);
    main.show(&record).unwrap();
    let copy = update.open(&record).unwrap();
    s.widget(ScreenType::Update, "salary").type_in(1200);

    s.widget(ScreenType::Main, "name").type_in("Ada L.");

    assert_eq!(record.value("name").unwrap(), ItemValue::from("Ada L."));
    assert_eq!(s.widget(ScreenType::Main, "name").value(), ItemValue::from("Ada L."));
    assert_eq!(s.widget(ScreenType::Update, "name").value(), ItemValue::from("Ada L."));
    assert_eq!(copy.value("name").unwrap(), ItemValue::from("Ada L."));
    // The popup's own pending edit survives.
    assert_eq!(s.widget(ScreenType::Update, "salary").value(), ItemValue::from(1200));
    assert_eq!(record.value("salary").unwrap(), ItemValue::from(1000));

    update.commit().unwrap();
    assert_eq!(record.value("name").unwrap(), ItemValue::from("Ada L."));
    assert_eq!(record.value("salary").unwrap(), ItemValue::from(1200));
    assert_eq!(s.widget(ScreenType::Main, "salary").value(), ItemValue::from(1200));
}

#[test]
fn test_code_edit_of_live_record_dirties_block_and_refreshes_screens() {
    let s = session();
    let main = s.main();
    let update = s.update();
    let shown = s.employee("Ada", 1000);
    let other = s.employee("Grace", 2000);
    main.show(&shown).unwrap();
    update.open(&shown).unwrap();

    shown.set_value("salary", 1100).unwrap();
    assert_eq!(s.widget(ScreenType::Main, "salary").value(), ItemValue::from(1100));
    assert_eq!(s.widget(ScreenType::Update, "salary").value(), ItemValue::from(1100));
    assert!(shown.is_marked_for_update());
    assert!(s.block.is_dirty());

    other.set_value("name", "Grace H.").unwrap();
    assert!(other.is_marked_for_update());
    assert_eq!(s.block.updated_records().len(), 2);
    assert_eq!(s.widget(ScreenType::Main, "name").value(), ItemValue::from("Ada"));
    assert_eq!(s.widget(ScreenType::Update, "name").value(), ItemValue::from("Ada"));
}

#[test]
fn test_block_refuses_record_it_did_not_create() {
    let s = session();
    let loose = DataRecord::new(s.block.definition().clone()).unwrap();

    let err = s.block.add_queried_record(loose).unwrap_err();
    assert!(matches!(err, Error::ForeignRecord { .. }));
    assert_eq!(s.block.record_count(), 0);
}
