use slotmap::new_key_type;

new_key_type! {
    /// Identifies an action owned by a route sheet. Stays valid across
    /// sorting and reindexing; invalidated when the action is deleted.
    pub struct ActionId;
}

#[cfg(test)]
mod tests {
    use crate::action::{Action, ActionType};
    use crate::route_sheet::{RouteSheet, RouteSheetError};

    #[test]
    fn ids_follow_actions_through_sorting() {
        let mut sheet = RouteSheet::new(18);
        let known = sheet.append_action(Action::known(6.0)).unwrap();
        let note = sheet.append_action(Action::note(3.0, "first")).unwrap();

        assert_eq!(sheet.index_of(note), Some(1));
        assert_eq!(sheet.index_of(known), Some(2));
        assert_eq!(sheet.action(known).unwrap().action_type(), ActionType::Known);
        assert_eq!(sheet.id_at(1), Some(note));
    }

    #[test]
    fn deleted_ids_are_stale() {
        let mut sheet = RouteSheet::new(18);
        let note = sheet.append_action(Action::note(3.0, "gone")).unwrap();
        let known = sheet.append_action(Action::known(6.0)).unwrap();
        sheet.delete_action(note).unwrap();

        assert!(sheet.action(note).is_none());
        assert_eq!(sheet.index_of(note), None);
        assert_eq!(sheet.delete_action(note), Err(RouteSheetError::UnknownAction(note)));
        assert_eq!(sheet.index_of(known), Some(1));

        // A new action never reuses the stale id.
        let again = sheet.append_action(Action::note(3.0, "new")).unwrap();
        assert_ne!(again, note);
        assert!(sheet.action(note).is_none());
    }
}
