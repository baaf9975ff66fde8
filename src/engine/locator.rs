//! Entity lookup over a document snapshot.
//!
//! Lookup and duplicate detection ignore case. When an owner is given the scan
//! is restricted to that data object; otherwise every data object is scanned in
//! document order and the first match wins, reported together with its owner.
//! Flow lookups apply the kind discriminant while scanning, so a name match of
//! the wrong kind is a miss.

use thiserror::Error;

use appmodel_types::{
    ChildKind, DataObject, Document, Family, FlowKind, FlowRecord, Item, Report, UserStory,
};

/// Case-insensitive name comparison.
pub fn names_match(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b) || a.to_lowercase() == b.to_lowercase()
}

/// Which part of a lookup failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Miss {
    /// The named owner data object does not exist.
    Owner,
    /// No entity with that name exists in scope.
    Entity,
    /// An entity with that name exists but is of another kind (`None` when its
    /// discriminants conflict).
    Discriminant { actual: Option<FlowKind> },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocateError {
    #[error("{}", not_found_message(label, name, owner.as_deref(), *miss))]
    NotFound {
        label: &'static str,
        name: String,
        owner: Option<String>,
        miss: Miss,
    },

    #[error("{}", duplicate_message(label, name, existing_owner.as_deref()))]
    Duplicate {
        label: &'static str,
        name: String,
        existing_owner: Option<String>,
    },
}

impl LocateError {
    pub fn miss(&self) -> Option<Miss> {
        match self {
            LocateError::NotFound { miss, .. } => Some(*miss),
            LocateError::Duplicate { .. } => None,
        }
    }
}

fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn not_found_message(label: &str, name: &str, owner: Option<&str>, miss: Miss) -> String {
    match (miss, owner) {
        (Miss::Owner, Some(owner)) => format!("Data object '{owner}' not found"),
        (Miss::Owner, None) => "Owner data object not found".to_string(),
        (Miss::Entity, Some(owner)) => {
            format!(
                "{} '{name}' not found in data object '{owner}'",
                capitalize(label)
            )
        }
        (Miss::Entity, None) => format!("{} '{name}' not found", capitalize(label)),
        (Miss::Discriminant { actual: Some(actual) }, _) => {
            format!("'{name}' exists but is a {actual}, not a {label}")
        }
        (Miss::Discriminant { actual: None }, _) => format!(
            "'{name}' exists but its discriminants match more than one kind, so it is not a {label}"
        ),
    }
}

fn duplicate_message(label: &str, name: &str, existing_owner: Option<&str>) -> String {
    match existing_owner {
        Some(owner) => format!("A {label} named '{name}' already exists in '{owner}'"),
        None => format!("A {label} named '{name}' already exists"),
    }
}

/// Index path of a located entity inside the snapshot it was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    /// Index of the owning data object in scan order.
    pub object: usize,
    /// Index inside the owner's collection (equal to `object` for data objects).
    pub index: usize,
}

/// A found entity and the data object that holds it.
#[derive(Debug, Clone, Copy)]
pub struct Located<'a, T> {
    pub owner_object_name: &'a str,
    pub entity: &'a T,
    pub position: Position,
}

/// Lookup over the data objects of one snapshot.
pub struct EntityLocator<'a> {
    objects: Vec<&'a DataObject>,
}

impl<'a> EntityLocator<'a> {
    pub fn new(objects: impl IntoIterator<Item = &'a DataObject>) -> Self {
        Self {
            objects: objects.into_iter().collect(),
        }
    }

    pub fn for_document(doc: &'a Document) -> Self {
        Self::new(doc.data_objects())
    }

    /// Owners in scope: the named owner only, or every data object.
    fn scope(
        &self,
        label: &'static str,
        name: &str,
        owner: Option<&str>,
    ) -> Result<Vec<(usize, &'a DataObject)>, LocateError> {
        let all = self.objects.iter().copied().enumerate();
        match owner {
            None => Ok(all.collect()),
            Some(owner_name) => {
                let scoped: Vec<_> = all.filter(|(_, o)| names_match(&o.name, owner_name)).collect();
                if scoped.is_empty() {
                    Err(LocateError::NotFound {
                        label,
                        name: name.to_string(),
                        owner: Some(owner_name.to_string()),
                        miss: Miss::Owner,
                    })
                } else {
                    Ok(scoped)
                }
            }
        }
    }

    pub fn find_data_object(&self, name: &str) -> Result<Located<'a, DataObject>, LocateError> {
        self.objects
            .iter()
            .copied()
            .enumerate()
            .find(|(_, o)| names_match(&o.name, name))
            .map(|(i, o)| Located {
                owner_object_name: &o.name,
                entity: o,
                position: Position {
                    object: i,
                    index: i,
                },
            })
            .ok_or_else(|| LocateError::NotFound {
                label: Family::DataObject.label(),
                name: name.to_string(),
                owner: None,
                miss: Miss::Entity,
            })
    }

    pub fn find_report(
        &self,
        name: &str,
        owner: Option<&str>,
    ) -> Result<Located<'a, Report>, LocateError> {
        let label = Family::Report.label();
        for (object_index, object) in self.scope(label, name, owner)? {
            if let Some((index, report)) = object
                .report
                .iter()
                .enumerate()
                .find(|(_, r)| names_match(&r.name, name))
            {
                return Ok(Located {
                    owner_object_name: &object.name,
                    entity: report,
                    position: Position {
                        object: object_index,
                        index,
                    },
                });
            }
        }
        Err(LocateError::NotFound {
            label,
            name: name.to_string(),
            owner: owner.map(str::to_string),
            miss: Miss::Entity,
        })
    }

    /// Find a flow record of the given kind.
    pub fn find_flow(
        &self,
        kind: FlowKind,
        name: &str,
        owner: Option<&str>,
    ) -> Result<Located<'a, FlowRecord>, LocateError> {
        let label = kind.label();
        let mut wrong_kind: Option<Option<FlowKind>> = None;

        for (object_index, object) in self.scope(label, name, owner)? {
            for (index, flow) in object.object_workflow.iter().enumerate() {
                if !names_match(&flow.name, name) {
                    continue;
                }
                let actual = flow.kind();
                if actual == Some(kind) {
                    return Ok(Located {
                        owner_object_name: &object.name,
                        entity: flow,
                        position: Position {
                            object: object_index,
                            index,
                        },
                    });
                }
                wrong_kind.get_or_insert(actual);
            }
        }

        Err(LocateError::NotFound {
            label,
            name: name.to_string(),
            owner: owner.map(str::to_string),
            miss: match wrong_kind {
                Some(actual) => Miss::Discriminant { actual },
                None => Miss::Entity,
            },
        })
    }

    /// Every report, with its owner, optionally filtered by owner and name.
    pub fn reports(
        &self,
        owner: Option<&str>,
        name: Option<&str>,
    ) -> Vec<Located<'a, Report>> {
        let mut found = Vec::new();
        for (object_index, object) in self.objects.iter().copied().enumerate() {
            if owner.is_some_and(|o| !names_match(&object.name, o)) {
                continue;
            }
            for (index, report) in object.report.iter().enumerate() {
                if name.is_some_and(|n| !names_match(&report.name, n)) {
                    continue;
                }
                found.push(Located {
                    owner_object_name: &object.name,
                    entity: report,
                    position: Position {
                        object: object_index,
                        index,
                    },
                });
            }
        }
        found
    }

    /// Every flow of `kind`, with its owner, optionally filtered by owner and name.
    pub fn flows(
        &self,
        kind: FlowKind,
        owner: Option<&str>,
        name: Option<&str>,
    ) -> Vec<Located<'a, FlowRecord>> {
        let mut found = Vec::new();
        for (object_index, object) in self.objects.iter().copied().enumerate() {
            if owner.is_some_and(|o| !names_match(&object.name, o)) {
                continue;
            }
            for (index, flow) in object.object_workflow.iter().enumerate() {
                if flow.kind() != Some(kind) || name.is_some_and(|n| !names_match(&flow.name, n)) {
                    continue;
                }
                found.push(Located {
                    owner_object_name: &object.name,
                    entity: flow,
                    position: Position {
                        object: object_index,
                        index,
                    },
                });
            }
        }
        found
    }

    /// Reject a new top-level name that is already taken anywhere in the snapshot.
    ///
    /// Reports are unique among reports; every flow family shares one name
    /// space because all of them live in `objectWorkflow`.
    pub fn ensure_unique(&self, family: Family, name: &str) -> Result<(), LocateError> {
        let existing_owner = match family {
            Family::DataObject => self
                .objects
                .iter()
                .find(|o| names_match(&o.name, name))
                .map(|_| None),
            Family::Report => self
                .objects
                .iter()
                .find(|o| o.report.iter().any(|r| names_match(&r.name, name)))
                .map(|o| Some(o.name.clone())),
            Family::Workflow | Family::GeneralFlow | Family::PageInitFlow => self
                .objects
                .iter()
                .find(|o| o.object_workflow.iter().any(|f| names_match(&f.name, name)))
                .map(|o| Some(o.name.clone())),
            Family::UserStory => None,
        };

        match existing_owner {
            Some(existing_owner) => Err(LocateError::Duplicate {
                label: family.label(),
                name: name.to_string(),
                existing_owner,
            }),
            None => Ok(()),
        }
    }
}

/// Find a nested item by its key attribute, ignoring case.
pub fn find_child<'i>(items: &'i [Item], kind: ChildKind, name: &str) -> Option<(usize, &'i Item)> {
    items
        .iter()
        .enumerate()
        .find(|(_, item)| item.text(kind.key_field()).is_some_and(|k| names_match(k, name)))
}

/// Like [`find_child`], reporting a miss against `parent`.
pub fn require_child<'i>(
    items: &'i [Item],
    kind: ChildKind,
    name: &str,
    parent: &str,
) -> Result<(usize, &'i Item), LocateError> {
    find_child(items, kind, name).ok_or_else(|| LocateError::NotFound {
        label: kind.label(),
        name: name.to_string(),
        owner: Some(parent.to_string()),
        miss: Miss::Entity,
    })
}

/// Reject a nested item name already used inside the same parent.
pub fn ensure_unique_child(
    items: &[Item],
    kind: ChildKind,
    name: &str,
    parent: &str,
) -> Result<(), LocateError> {
    match find_child(items, kind, name) {
        Some(_) => Err(LocateError::Duplicate {
            label: kind.label(),
            name: name.to_string(),
            existing_owner: Some(parent.to_string()),
        }),
        None => Ok(()),
    }
}

/// Find a user story by its number, or failing that by its text.
pub fn find_user_story<'s>(
    stories: impl IntoIterator<Item = &'s UserStory>,
    key: &str,
) -> Result<(usize, &'s UserStory), LocateError> {
    let stories: Vec<_> = stories.into_iter().collect();
    stories
        .iter()
        .copied()
        .enumerate()
        .find(|(_, s)| s.story_number.as_deref().is_some_and(|n| names_match(n, key)))
        .or_else(|| {
            stories
                .iter()
                .copied()
                .enumerate()
                .find(|(_, s)| names_match(&s.story_text, key))
        })
        .ok_or_else(|| LocateError::NotFound {
            label: Family::UserStory.label(),
            name: key.to_string(),
            owner: None,
            miss: Miss::Entity,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn snapshot() -> Document {
        Document::from_value(json!({
            "root": {"namespace": [{
                "name": "Main",
                "object": [
                    {
                        "name": "Customer",
                        "report": [{"name": "customerlist", "reportColumn": [
                            {"name": "Email"}, {"name": "Phone"}
                        ]}],
                        "objectWorkflow": [
                            {"name": "CustomerAdd"},
                            {"name": "CustomerListInitReport"},
                            {"name": "ApproveCustomer", "isDynaFlow": "true"}
                        ]
                    },
                    {
                        "name": "Order",
                        "report": [{"name": "CustomerList"}, {"name": "OrderList"}],
                        "objectWorkflow": [
                            {"name": "ShipOrderInitObjWF", "isDynaFlow": "true"},
                            {"name": "ShipOrder", "isDynaFlow": "true"}
                        ]
                    }
                ],
                "userStory": [
                    {"storyNumber": "1", "storyText": "A Customer wants to view all orders"}
                ]
            }]}
        }))
        .unwrap()
    }

    #[test]
    fn test_first_match_wins_with_true_owner() {
        let doc = snapshot();
        let locator = EntityLocator::for_document(&doc);
        let found = locator.find_report("CustomerList", None).unwrap();
        assert_eq!(found.owner_object_name, "Customer");
        assert_eq!(found.entity.name, "customerlist");
        assert_eq!(found.position, Position { object: 0, index: 0 });
    }

    #[test]
    fn test_owner_restricts_scope() {
        let doc = snapshot();
        let locator = EntityLocator::for_document(&doc);
        let found = locator.find_report("customerLIST", Some("order")).unwrap();
        assert_eq!(found.owner_object_name, "Order");
        assert_eq!(found.entity.name, "CustomerList");
        assert_eq!(found.position, Position { object: 1, index: 0 });
    }

    #[test]
    fn test_unknown_owner_is_owner_miss() {
        let doc = snapshot();
        let locator = EntityLocator::for_document(&doc);
        let err = locator.find_report("CustomerList", Some("Invoice")).unwrap_err();
        assert_eq!(err.miss(), Some(Miss::Owner));
        assert_eq!(err.to_string(), "Data object 'Invoice' not found");
    }

    #[test]
    fn test_missing_entity_in_owner() {
        let doc = snapshot();
        let locator = EntityLocator::for_document(&doc);
        let err = locator.find_report("OrderList", Some("Customer")).unwrap_err();
        assert_eq!(err.miss(), Some(Miss::Entity));
        assert_eq!(
            err.to_string(),
            "Report 'OrderList' not found in data object 'Customer'"
        );
    }

    #[test]
    fn test_wrong_kind_is_discriminant_miss() {
        let doc = snapshot();
        let locator = EntityLocator::for_document(&doc);
        let err = locator
            .find_flow(FlowKind::Workflow, "CustomerAdd", None)
            .unwrap_err();
        assert_eq!(
            err.miss(),
            Some(Miss::Discriminant {
                actual: Some(FlowKind::GeneralFlow)
            })
        );
        assert_eq!(
            err.to_string(),
            "'CustomerAdd' exists but is a general flow, not a workflow"
        );
    }

    #[test]
    fn test_conflicting_record_never_matches() {
        let doc = snapshot();
        let locator = EntityLocator::for_document(&doc);
        for kind in [FlowKind::Workflow, FlowKind::PageInitFlow] {
            let err = locator
                .find_flow(kind, "ShipOrderInitObjWF", None)
                .unwrap_err();
            assert_eq!(err.miss(), Some(Miss::Discriminant { actual: None }));
        }
    }

    #[test]
    fn test_flow_lookup_by_kind() {
        let doc = snapshot();
        let locator = EntityLocator::for_document(&doc);
        let page = locator
            .find_flow(FlowKind::PageInitFlow, "customerlistinitreport", None)
            .unwrap();
        assert_eq!(page.owner_object_name, "Customer");
        assert_eq!(page.position.index, 1);

        let workflows = locator.flows(FlowKind::Workflow, None, None);
        let names: Vec<_> = workflows.iter().map(|l| l.entity.name.as_str()).collect();
        assert_eq!(names, vec!["ApproveCustomer", "ShipOrder"]);
    }

    #[test]
    fn test_duplicates_are_global_for_reports_and_flows() {
        let doc = snapshot();
        let locator = EntityLocator::for_document(&doc);
        let err = locator.ensure_unique(Family::Report, "ORDERLIST").unwrap_err();
        assert_eq!(
            err,
            LocateError::Duplicate {
                label: "report",
                name: "ORDERLIST".into(),
                existing_owner: Some("Order".into()),
            }
        );
        // Flow families share one name space.
        assert!(locator
            .ensure_unique(Family::GeneralFlow, "approvecustomer")
            .is_err());
        assert!(locator.ensure_unique(Family::Report, "InvoiceList").is_ok());
        assert!(locator.ensure_unique(Family::DataObject, "customer").is_err());
    }

    #[test]
    fn test_children_are_local() {
        let doc = snapshot();
        let locator = EntityLocator::for_document(&doc);
        let report = locator.find_report("CustomerList", Some("Customer")).unwrap();
        let (index, _) = find_child(&report.entity.report_column, ChildKind::Column, "PHONE").unwrap();
        assert_eq!(index, 1);
        assert!(ensure_unique_child(
            &report.entity.report_column,
            ChildKind::Column,
            "email",
            "customerlist"
        )
        .is_err());
        assert!(
            ensure_unique_child(&report.entity.report_column, ChildKind::Column, "Name", "x")
                .is_ok()
        );
    }

    #[test]
    fn test_user_story_by_number_or_text() {
        let doc = snapshot();
        let (index, _) = find_user_story(doc.user_stories(), "1").unwrap();
        assert_eq!(index, 0);
        assert!(find_user_story(doc.user_stories(), "a customer wants to view all orders").is_ok());
        assert!(find_user_story(doc.user_stories(), "2").is_err());
    }

    fn flip_case(name: &str, mask: &[bool]) -> String {
        name.chars()
            .zip(mask.iter().cycle())
            .map(|(c, flip)| {
                if *flip {
                    if c.is_ascii_uppercase() {
                        c.to_ascii_lowercase()
                    } else {
                        c.to_ascii_uppercase()
                    }
                } else {
                    c
                }
            })
            .collect()
    }

    proptest! {
        #[test]
        fn lookup_ignores_case(
            which in 0usize..3,
            mask in prop::collection::vec(any::<bool>(), 1..16),
        ) {
            let doc = snapshot();
            let locator = EntityLocator::for_document(&doc);
            let name = ["CustomerList", "OrderList", "customerlist"][which];
            let variant = flip_case(name, &mask);

            let a = locator.find_report(name, None).unwrap();
            let b = locator.find_report(&variant, None).unwrap();
            prop_assert_eq!(a.owner_object_name, b.owner_object_name);
            prop_assert_eq!(a.position, b.position);
        }
    }
}
