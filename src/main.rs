use minilisp::{Environment, Sexpr, evaluate, parse, stringify};

fn main() {
    let mut env = Environment::new();
    let program = [
        "(define fact (lambda (n) (if (= n 0) 1 (* n (fact (- n 1))))))",
        "(fact 5)",
        "(cdr (quote (1 2 3)))",
    ];

    for input in program {
        println!("> {}", input);
        match parse(input) {
            Ok(node) => match evaluate(&node, &mut env) {
                Ok(result) if result.kind == Sexpr::Nil => println!("=> nil"),
                Ok(result) => println!("=> {}", stringify(&result)),
                Err(e) => e.report(input),
            },
            Err(e) => e.report(input),
        }
    }
}
