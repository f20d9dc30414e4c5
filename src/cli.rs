use crate::{
    api::HttpTransport,
    auth::AuthContext,
    config::Config,
    forms::{LoginForm, ProductForm, RegisterForm},
    pages::{Pages, Prompter, Screen},
    routes::Route,
    Command,
};
use anyhow::{anyhow, Result};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::PathBuf;

/// Redirect chains are short (guard -> login -> products); anything longer
/// is a bug.
const MAX_REDIRECTS: usize = 4;

pub struct Context {
    pub config: Config,
    pub storage_path: Option<PathBuf>,
    pub auth: AuthContext<HttpTransport>,
}

/// Prompts on the terminal through a rustyline editor.
struct EditorPrompter<'a> {
    rl: &'a mut DefaultEditor,
}

impl Prompter for EditorPrompter<'_> {
    fn ask(&mut self, label: &str, initial: &str) -> Result<String> {
        let line = self
            .rl
            .readline_with_initial(&format!("{}: ", label), (initial, ""))?;
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

fn print_screen(screen: &Screen) {
    if !screen.body.is_empty() {
        print!("{}", screen.body);
    }
    if let Some(error) = &screen.error {
        eprintln!("Error: {}", error);
    }
}

/// Visit `route` and follow redirects. Returns the last screen shown.
fn navigate(ctx: &mut Context, route: Route, rl: &mut DefaultEditor) -> Result<Screen> {
    let mut route = route;
    let mut prompter = EditorPrompter { rl };
    let mut pages = Pages::new(&mut ctx.auth, &ctx.config.display.currency);

    for _ in 0..MAX_REDIRECTS {
        let screen = pages.visit(route, &mut prompter)?;
        print_screen(&screen);
        match screen.redirect {
            Some(next) => {
                if next == Route::Login && route != Route::Login {
                    println!("Sign in to continue.");
                }
                route = next;
            }
            None => return Ok(screen),
        }
    }
    Err(anyhow!("too many redirects ending at {}", route))
}

fn finish(screen: Screen) -> Result<()> {
    match screen.error {
        Some(error) => Err(anyhow!(error)),
        None => Ok(()),
    }
}

/// Run one subcommand and exit.
pub fn run_once(mut ctx: Context, command: Command) -> Result<()> {
    let mut rl = DefaultEditor::new()?;

    match command {
        Command::Open { route } => finish(navigate(&mut ctx, Route::parse(&route), &mut rl)?),
        Command::List => finish(navigate(&mut ctx, Route::Products, &mut rl)?),
        Command::Show { id } => finish(navigate(&mut ctx, Route::ProductDetail(id), &mut rl)?),
        Command::Login { email, password } => match (email, password) {
            (Some(email), Some(password)) => {
                let mut pages = Pages::new(&mut ctx.auth, &ctx.config.display.currency);
                let screen = pages.submit_login(&LoginForm { email, password });
                print_screen(&screen);
                finish(screen)?;
                print_whoami(&ctx);
                Ok(())
            }
            _ => finish(navigate(&mut ctx, Route::Login, &mut rl)?),
        },
        Command::Register {
            name,
            email,
            password,
        } => match (name, email, password) {
            (Some(name), Some(email), Some(password)) => {
                let mut pages = Pages::new(&mut ctx.auth, &ctx.config.display.currency);
                let screen = pages.submit_register(&RegisterForm {
                    name,
                    email,
                    confirm_password: password.clone(),
                    password,
                });
                print_screen(&screen);
                finish(screen)?;
                print_whoami(&ctx);
                Ok(())
            }
            _ => finish(navigate(&mut ctx, Route::Register, &mut rl)?),
        },
        Command::Logout => {
            ctx.auth.logout()?;
            println!("Signed out.");
            Ok(())
        }
        Command::Whoami => {
            print_whoami(&ctx);
            Ok(())
        }
        Command::Create {
            name,
            description,
            price,
            stock,
        } => {
            let (Some(name), Some(price)) = (name, price) else {
                return finish(navigate(&mut ctx, Route::NewProduct, &mut rl)?);
            };
            require_session(&ctx)?;
            let form = ProductForm {
                name,
                description: description.unwrap_or_default(),
                price,
                stock_quantity: stock.unwrap_or_else(|| "0".to_string()),
            };
            let mut pages = Pages::new(&mut ctx.auth, &ctx.config.display.currency);
            let screen = pages.submit_product(None, &form);
            print_screen(&screen);
            finish(screen)?;
            println!("Product created.");
            Ok(())
        }
        Command::Update {
            id,
            name,
            description,
            price,
            stock,
        } => {
            if name.is_none() && description.is_none() && price.is_none() && stock.is_none() {
                return finish(navigate(&mut ctx, Route::EditProduct(id), &mut rl)?);
            }
            require_session(&ctx)?;
            let mut pages = Pages::new(&mut ctx.auth, &ctx.config.display.currency);
            let Some(current) = pages.find_product(id) else {
                return Err(anyhow!("Product not found"));
            };
            let mut form = ProductForm::from_fields(&current.fields());
            if let Some(name) = name {
                form.name = name;
            }
            if let Some(description) = description {
                form.description = description;
            }
            if let Some(price) = price {
                form.price = price;
            }
            if let Some(stock) = stock {
                form.stock_quantity = stock;
            }
            let screen = pages.submit_product(Some(id), &form);
            print_screen(&screen);
            finish(screen)?;
            println!("Product {} updated.", id);
            Ok(())
        }
    }
}

fn require_session(ctx: &Context) -> Result<()> {
    if ctx.auth.is_authenticated() {
        Ok(())
    } else {
        Err(anyhow!("Not signed in. Run `stockroom login` first."))
    }
}

fn print_whoami(ctx: &Context) {
    match ctx.auth.user() {
        Some(user) => {
            println!("Signed in as {} <{}> (id {})", user.name, user.email, user.id);
            if let Some(expires) = &user.expires_at {
                println!("Token expires: {}", expires);
            }
        }
        None => println!("Not signed in."),
    }
}

pub fn run_repl(mut ctx: Context) -> Result<()> {
    let mut rl = DefaultEditor::new()?;

    println!("stockroom - type help for commands, exit to quit");
    if let Err(e) = navigate(&mut ctx, Route::Products, &mut rl) {
        eprintln!("Error: {}", e);
    }

    loop {
        match rl.readline("stockroom> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                rl.add_history_entry(line)?;

                let words = match shell_words::split(line) {
                    Ok(words) => words,
                    Err(e) => {
                        eprintln!("Input error: {}", e);
                        continue;
                    }
                };
                match handle_command(&mut ctx, &words, &mut rl) {
                    Ok(true) => break,
                    Ok(false) => {}
                    Err(e) => eprintln!("Error: {}", e),
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {}", e);
                break;
            }
        }
    }

    Ok(())
}

/// Returns true when the REPL should exit.
fn handle_command(ctx: &mut Context, words: &[String], rl: &mut DefaultEditor) -> Result<bool> {
    let Some(first) = words.first() else {
        return Ok(false);
    };

    if first.starts_with('/') {
        navigate(ctx, Route::parse(first), rl)?;
        return Ok(false);
    }

    let id_arg = || -> Result<u64> {
        words
            .get(1)
            .ok_or_else(|| anyhow!("Usage: {} <id>", first))?
            .parse::<u64>()
            .map_err(|_| anyhow!("Invalid product id: {}", words[1]))
    };

    match first.as_str() {
        "exit" | "quit" => return Ok(true),
        "help" => {
            println!("Navigation:");
            println!("  /products             - list products");
            println!("  /products/new         - add a product");
            println!("  /products/<id>        - product details");
            println!("  /products/<id>/edit   - edit a product");
            println!("  /login, /register     - sign in or create an account");
            println!("Shortcuts:");
            println!("  list | show <id> | new | edit <id>");
            println!("Session:");
            println!("  whoami                - show the signed-in user");
            println!("  logout                - sign out");
            println!("  session               - show storage and backend settings");
            println!("  exit                  - quit");
        }
        "list" => {
            navigate(ctx, Route::Products, rl)?;
        }
        "show" => {
            let id = id_arg()?;
            navigate(ctx, Route::ProductDetail(id), rl)?;
        }
        "new" => {
            navigate(ctx, Route::NewProduct, rl)?;
        }
        "edit" => {
            let id = id_arg()?;
            navigate(ctx, Route::EditProduct(id), rl)?;
        }
        "whoami" => print_whoami(ctx),
        "logout" => {
            ctx.auth.logout()?;
            println!("Signed out.");
            navigate(ctx, Route::Login, rl)?;
        }
        "session" => {
            let api = ctx.auth.api();
            println!("Backend: {}", ctx.config.api.base_url);
            println!("Dialect: {}", api.dialect().as_str());
            println!("Session layout: {:?}", api.sessions().layout());
            match &ctx.storage_path {
                Some(path) => println!("Storage: {}", path.display()),
                None => println!("Storage: in memory"),
            }
        }
        other => println!("Unknown command: {}. Type help for commands.", other),
    }
    Ok(false)
}
