//! Fixed static question catalog
//!
//! Seeded at startup; static entries are never persisted remotely and keep
//! their catalog order after the user's custom questions.

use crate::model::Question;

/// Raw catalog entries as `(id, text, category)` triples
const CATALOG: &[(&str, &str, &str)] = &[
    // Basics
    ("1", "What is Angular Framework?", "Basics"),
    ("2", "What is the difference between AngularJS and Angular?", "Basics"),
    ("3", "What is TypeScript?", "Basics"),
    ("4", "Write a pictorial diagram of Angular architecture?", "Basics"),
    ("5", "What are the key components of Angular?", "Architecture"),
    ("6", "What are directives?", "Basics"),
    ("7", "What are components?", "Basics"),
    ("8", "What are the differences between Component and Directive?", "Basics"),
    ("9", "What is a template?", "Basics"),
    ("10", "What is a module?", "Basics"),
    ("11", "What are the lifecycle hooks available?", "Lifecycle"),
    ("12", "What is data binding?", "Basics"),
    ("13", "What is metadata?", "Architecture"),
    ("14", "What is Angular CLI?", "Tooling"),
    ("15", "What is the difference between constructor and ngOnInit?", "Lifecycle"),
    ("16", "What is a service?", "Architecture"),
    ("17", "What is dependency injection in Angular?", "Architecture"),
    ("19", "What is the purpose of async pipe?", "Pipes"),
    ("21", "What is the purpose of *ngFor directive?", "Directives"),
    ("22", "What is the purpose of ngIf directive?", "Directives"),
    ("33", "What is the difference between pure and impure pipe?", "Pipes"),
    ("36", "What is HttpClient and its benefits?", "HTTP"),
    ("44", "What is the difference between promise and observable?", "RxJS"),
    ("63", "What is Angular Router?", "Routing"),
    ("111", "What is Angular Ivy?", "Advanced"),
    ("143", "What is lazy loading?", "Advanced"),
    // Architecture & APIs
    ("y1", "What is a good use case for ngrx/store or ngrx/entity?", "Architecture"),
    (
        "y2",
        "Can you talk about a bug related to a race condition, how to solve it and how to test it?",
        "Architecture",
    ),
    (
        "y3",
        "What is the difference between a smart/container component and a dumb/presentational component?",
        "Architecture",
    ),
    ("y4", "Why would you use renderer methods instead of native element methods?", "Advanced"),
    ("y7", "How would you protect a component being activated through the router?", "Routing"),
    // Templates & components
    (
        "t1",
        "What happens if you subscribe to a data source multiple times with async pipe?",
        "Templates",
    ),
    ("t2", "What is the difference between ng-content, ng-container and ng-template?", "Templates"),
    ("t3", "Are you working with attributes or properties in data-binding?", "Templates"),
    // Observables
    ("r1", "What is the difference between an observable and a subject?", "RxJS"),
    (
        "r2",
        "How would you implement multiple api calls that need to happen in order using rxjs?",
        "RxJS",
    ),
    ("r3", "What is the difference between switchMap, concatMap and mergeMap?", "RxJS"),
    ("r4", "What is the difference between scan() vs reduce()?", "RxJS"),
    // Modern challenges
    ("c1", "What is GraphQL and how does it compare to REST?", "Modern Tech"),
    (
        "c2",
        "How would you recreate Angular's [(ngModel)] behavior in plain JavaScript?",
        "Challenges",
    ),
    ("c3", "What is the difference between readonly and const in TypeScript?", "TypeScript"),
    ("c4", "What are XSS attacks, and how do you secure Angular apps from them?", "Security"),
    // General JS/TS
    ("g1", "Explain the difference between var, let and const.", "JavaScript"),
    ("g2", "What is hoisting in JavaScript?", "JavaScript"),
    ("g3", "What is a closure?", "JavaScript"),
    ("g4", "What is memoization?", "JavaScript"),
];

/// The fixed catalog in its canonical order
#[must_use]
pub fn static_questions() -> Vec<Question> {
    CATALOG
        .iter()
        .map(|(id, text, category)| Question::catalog(id, text, category))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_ids_are_unique() {
        let questions = static_questions();
        let mut ids: Vec<&str> = questions.iter().map(|q| q.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), questions.len());
    }

    #[test]
    fn catalog_order_is_stable() {
        let questions = static_questions();
        assert_eq!(questions[0].id, "1");
        assert_eq!(questions.last().unwrap().id, "g4");
        assert!(questions.iter().all(|q| !q.is_custom));
    }
}
