use std::path::PathBuf;

use anyhow::Result;
use event2py::{to_script, ScriptLines};
use ve_formats::{ActionKind, EventDocument, EventError};

const EXPECTED: &str = r#"# import game interface
from events import GameInterface


# action 0: beach walk
def try_():
    # action 1
    if game.is_scheduled_for_today(eventname) is False:
        # action 2
        return True  # accept event
    else:
        return


def execute():
    # action 3
    person_list_100 = game.get_person_list("Present")
    # action 4
    len_person_list_100 = len(person_list_100)  # var id 101
    # action 5
    if len_person_list_100 < 1:
        return
    else:
        # action 6
        from random import randint

        if 70 < randint(1, 100):  # not passed
            # action 9: waves
            pass
        else:
            # action 7
            game.show_text("""The sea is calm.""")
            # action 8
            game.pass_time(1, 0, "normal")
            # action 10
            game.set_schedule(eventname, days=3)


# define variables
game = GameInterface()
eventname = "BeachWalk"
"#;

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("BeachWalk.ve.xml")
}

#[test]
fn beach_walk_translates_to_expected_script() -> Result<()> {
    let document = EventDocument::from_path(fixture())?;
    assert_eq!(document.trigger_type.as_deref(), Some("Location"));
    assert_eq!(document.actions.len(), 11);
    assert_eq!(document.variables.len(), 6);
    assert_eq!(
        document.actions.get(9).map(|node| node.kind),
        Some(ActionKind::Unsupported)
    );

    let script = to_script(&document)?;
    assert_eq!(script.event_name, "BeachWalk");
    assert_eq!(script.text(), EXPECTED);
    assert_eq!(script.unsupported.len(), 1);
    assert_eq!(script.unsupported[0].id, 9);
    assert_eq!(script.unsupported[0].kind, "PlaySound");
    Ok(())
}

#[test]
fn repeated_generation_is_identical() -> Result<()> {
    let document = EventDocument::from_path(fixture())?;
    let first = to_script(&document)?;
    let second = to_script(&document)?;
    assert_eq!(first.text(), second.text());
    Ok(())
}

#[test]
fn script_blocks_are_balanced() -> Result<()> {
    let document = EventDocument::from_path(fixture())?;
    let script = to_script(&document)?;

    // Indentation only deepens right after a line that opens a block.
    let mut replay = ScriptLines::new();
    for line in script.lines() {
        let depth = (line.len() - line.trim_start().len()) / 4;
        while replay.indent_level() > depth && !line.is_empty() {
            replay.dedent();
        }
        replay.append(line.trim_start());
    }
    while replay.indent_level() > 0 {
        replay.dedent();
    }
    assert_eq!(replay.lines(), script.lines());
    Ok(())
}

#[test]
fn unresolved_link_is_reported() -> Result<()> {
    let text = std::fs::read_to_string(fixture())?.replace(
        "<OutputLink><Name>Out</Name><OutputIDs><unsignedInt>10</unsignedInt></OutputIDs></OutputLink>",
        "<OutputLink><Name>Out</Name><OutputIDs><unsignedInt>77</unsignedInt></OutputIDs></OutputLink>",
    );
    let document = EventDocument::parse_str(&text, "Broken.ve.xml")?;
    assert!(matches!(
        to_script(&document),
        Err(EventError::UnresolvedReference(_))
    ));
    Ok(())
}
