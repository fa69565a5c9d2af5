use alloc::{string::ToString, vec::Vec};

use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};

use crate::{GenList, ListError, ParseError, ParseErrorKind};

fn random_list(rng: &mut StdRng, pool: &mut Vec<GenList>, budget: usize) -> GenList {
    let mut list = GenList::new().unwrap();

    for _ in 0..rng.gen_range(0..budget.max(1)) {
        match rng.gen_range(0..5) {
            0 if budget > 1 => {
                let sub = random_list(rng, pool, budget / 2);
                list.push_list(&sub).unwrap();
                pool.push(sub);
            }
            1 if !pool.is_empty() => {
                let sub = pool.choose(rng).unwrap();
                list.push_list(sub).unwrap();
            }
            _ => {
                let atom = *b"abcdefghijklmnopqrstuvwxyz0123456789*.;".choose(rng).unwrap();
                list.push_atom(atom as char).unwrap();
            }
        }
    }

    list
}

#[test]
fn a_b_c_d() {
    let a = GenList::parse("()").unwrap();
    assert_eq!(a.to_string(), "()");
    assert_eq!(a.depth(), 1);
    assert!(a.is_empty());

    let b = GenList::parse("(x, y, z)").unwrap();
    assert_eq!(b.to_string(), "(x, y, z)");
    assert_eq!(b.depth(), 1);

    let mut c = GenList::new().unwrap();
    c.push_atom('z').unwrap();
    c.push_atom('y').unwrap();
    c.push_list(&b).unwrap();
    assert_eq!(c.to_string(), "((x, y, z), y, z)");
    assert_eq!(c.depth(), 2);

    let d = GenList::parse("(x, (y, z))").unwrap();
    assert_eq!(d.to_string(), "(x, (y, z))");
    assert_eq!(d.depth(), 2);

    let e = GenList::parse("(x,((y,z),w))").unwrap();
    assert_eq!(e.depth(), 3);

    assert_eq!(GenList::new().unwrap().depth(), 1);
}

#[test]
fn shared_sublists_see_later_pushes() {
    let mut b = GenList::parse("(x,y,z)").unwrap();
    let mut c = GenList::new().unwrap();
    c.push_list(&b).unwrap();
    c.push_atom('q').unwrap();

    b.push_atom('w').unwrap();

    assert_eq!(c.to_string(), "(q, (w, x, y, z))");
}

#[test]
fn deep_copies_do_not_see_later_pushes() {
    let mut b = GenList::parse("(x,y,z)").unwrap();
    let d = b.clone();

    b.push_atom('w').unwrap();

    assert_eq!(b.to_string(), "(w, x, y, z)");
    assert_eq!(d.to_string(), "(x, y, z)");
    assert_eq!(d.ref_count(), 1);
}

#[test]
fn copies_of_containers_do_not_share_sublists() {
    let mut b = GenList::parse("(x)").unwrap();
    let mut c = GenList::new().unwrap();
    c.push_list(&b).unwrap();
    c.push_list(&b).unwrap();

    let copy = c.try_clone().unwrap();
    b.push_atom('w').unwrap();

    assert_eq!(c.to_string(), "((w, x), (w, x))");
    assert_eq!(copy.to_string(), "((x), (x))");

    for element in &copy {
        assert_eq!(element.as_list().unwrap().ref_count(), 2);
    }
}

#[test]
fn show_round_trips_through_parse() {
    let mut rng = StdRng::seed_from_u64(0x5eed);

    for _ in 0..200 {
        let mut pool = Vec::new();
        let list = random_list(&mut rng, &mut pool, 12);
        let shown = list.to_string();

        let reread = GenList::parse(&shown).unwrap();

        assert_eq!(reread.to_string(), shown);
        assert_eq!(reread.depth(), list.depth());
        assert_eq!(reread.len(), list.len());
    }
}

#[test]
fn shared_sublist_freed_only_by_last_owner() {
    let mut rng = StdRng::seed_from_u64(42);

    for _ in 0..100 {
        let shared = GenList::parse("(s, (t))").unwrap();
        let probe = shared.first().unwrap();

        let mut owners = Vec::new();
        for _ in 0..rng.gen_range(1..6) {
            let mut container = GenList::parse("(c)").unwrap();
            container.push_list(&shared).unwrap();

            if rng.gen_bool(0.5) {
                let mut outer = GenList::new().unwrap();
                outer.push_list(&container).unwrap();
                owners.push(outer);
            }

            owners.push(container);
        }
        owners.push(shared);
        owners.shuffle(&mut rng);

        while let Some(owner) = owners.pop() {
            assert!(probe.is_present());
            drop(owner);
        }

        assert!(!probe.is_present());
    }
}

#[test]
fn failed_parse_returns_no_handle() {
    let error = GenList::parse("(a, (b, c)").unwrap_err();

    assert!(matches!(error, ListError::Parse(_)));
    assert_eq!(
        error.to_string(),
        "parse error at position 10: input ended before ')' closed the list"
    );
}

#[test]
fn whitespace_atoms_show_but_do_not_read_back() {
    let mut list = GenList::new().unwrap();
    list.push_atom('a').unwrap();
    list.push_atom(' ').unwrap();

    let shown = list.to_string();
    assert_eq!(shown, "( , a)");
    assert_eq!(list.len(), 2);

    assert_eq!(
        GenList::parse(&shown).unwrap_err(),
        ListError::Parse(ParseError {
            position: 2,
            kind: ParseErrorKind::UnexpectedDelimiter { found: ',' },
        })
    );
}

#[test]
fn deeply_nested_handles() {
    const LEVELS: usize = 100_000;

    let mut list = GenList::parse("(x)").unwrap();
    for _ in 1..LEVELS {
        let mut outer = GenList::new().unwrap();
        outer.push_list(&list).unwrap();
        list = outer;
    }

    assert_eq!(list.depth(), LEVELS);

    let shown = list.to_string();
    assert_eq!(shown.len(), 2 * LEVELS + 1);

    let copy = list.try_clone().unwrap();
    assert!(!copy.ptr_eq(&list));
    assert_eq!(copy.depth(), LEVELS);
    assert_eq!(copy.to_string(), shown);
}

#[cfg(feature = "std")]
#[test]
fn handles_cross_threads() {
    let mut b = GenList::parse("(x)").unwrap();
    let shared = b.share();

    let shown = std::thread::spawn(move || {
        let mut c = GenList::new().unwrap();
        c.push_list(&shared).unwrap();
        c.to_string()
    })
    .join()
    .unwrap();

    assert_eq!(shown, "((x))");
    assert_eq!(b.ref_count(), 1);

    b.push_atom('y').unwrap();
    assert_eq!(b.to_string(), "(y, x)");
}
