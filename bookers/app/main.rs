use diesel::sqlite::SqliteConnection;
use serde::Serialize;
use structopt::StructOpt;
use tracing_subscriber::EnvFilter;

use bookers::accounts::Registration;
use bookers::config::Config;
use bookers::{db, AppCtx, SearchMode, User};

#[derive(Debug, Clone, StructOpt)]
struct CommandOpt {
    #[structopt(flatten)]
    config: Config,
    #[structopt(subcommand)]
    subcommand: SubcommandOpt,
}

#[derive(Debug, Clone, StructOpt)]
enum SubcommandOpt {
    #[structopt(name = "migrate", about = "apply pending migrations")]
    Migrate,
    #[structopt(name = "guest", about = "find or create the guest account")]
    Guest,
    #[structopt(name = "register")]
    Register(RegisterOpt),
    #[structopt(name = "search")]
    Search(SearchOpt),
    #[structopt(name = "follow")]
    Follow(EdgeOpt),
    #[structopt(name = "unfollow")]
    Unfollow(EdgeOpt),
    #[structopt(name = "followings")]
    Followings(UserOpt),
    #[structopt(name = "followers")]
    Followers(UserOpt),
    #[structopt(name = "profile-image")]
    ProfileImage(ProfileImageOpt),
    #[structopt(name = "destroy", about = "delete an account and everything it owns")]
    Destroy(UserOpt),
}

#[derive(Debug, Clone, StructOpt)]
struct RegisterOpt {
    name: String,
    email: String,
    #[structopt(long, env = "BOOKERS_PASSWORD", hide_env_values = true)]
    password: String,
    #[structopt(long)]
    introduction: Option<String>,
}

#[derive(Debug, Clone, StructOpt)]
struct SearchOpt {
    #[structopt(
        long,
        default_value = "partial_match",
        help = "perfect_match, forward_match, backward_match or partial_match; anything else lists everything"
    )]
    mode: SearchMode,
    #[structopt(long, default_value = "")]
    word: String,
    #[structopt(long, help = "search book titles instead of user names")]
    books: bool,
}

#[derive(Debug, Clone, StructOpt)]
struct EdgeOpt {
    follower: String,
    followed: String,
}

#[derive(Debug, Clone, StructOpt)]
struct UserOpt {
    name: String,
}

#[derive(Debug, Clone, StructOpt)]
struct ProfileImageOpt {
    name: String,
    #[structopt(long, default_value = "100")]
    width: u32,
    #[structopt(long, default_value = "100")]
    height: u32,
}

fn main() -> failure::Fallible<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("bookers=info")),
        )
        .init();

    let opt = CommandOpt::from_args();
    let ctx = AppCtx::new(&opt.config)?;
    let mut conn = ctx.conn()?;
    run(&ctx, &mut conn, &opt.subcommand)
}

fn run(ctx: &AppCtx, conn: &mut SqliteConnection, subcommand: &SubcommandOpt) -> failure::Fallible<()> {
    match subcommand {
        SubcommandOpt::Migrate => {
            let applied = db::run_migrations(conn)?;
            println!("{} migration(s) applied", applied.len());
        }
        SubcommandOpt::Guest => print_json(&User::guest(conn)?)?,
        SubcommandOpt::Register(reg) => {
            let user = User::register(
                conn,
                &Registration {
                    name: &reg.name,
                    email: &reg.email,
                    password: &reg.password,
                    introduction: reg.introduction.as_deref(),
                },
            )?;
            print_json(&user)?;
        }
        SubcommandOpt::Search(search) => {
            if search.books {
                print_json(&bookers::Book::looks(conn, search.mode, &search.word)?)?;
            } else {
                print_json(&User::looks(conn, search.mode, &search.word)?)?;
            }
        }
        SubcommandOpt::Follow(edge) => {
            let follower = find_user(conn, &edge.follower)?;
            let followed = find_user(conn, &edge.followed)?;
            print_json(&follower.follow(conn, followed.id)?)?;
        }
        SubcommandOpt::Unfollow(edge) => {
            let follower = find_user(conn, &edge.follower)?;
            let followed = find_user(conn, &edge.followed)?;
            follower.unfollow(conn, followed.id)?;
        }
        SubcommandOpt::Followings(user) => {
            let user = find_user(conn, &user.name)?;
            print_json(&user.followings(conn)?)?;
        }
        SubcommandOpt::Followers(user) => {
            let user = find_user(conn, &user.name)?;
            print_json(&user.followers(conn)?)?;
        }
        SubcommandOpt::ProfileImage(image) => {
            let user = find_user(conn, &image.name)?;
            let variant =
                user.get_profile_image(conn, &ctx.disk, &ctx.assets_dir, image.width, image.height)?;
            print_json(&variant)?;
        }
        SubcommandOpt::Destroy(user) => {
            let user = find_user(conn, &user.name)?;
            user.destroy(conn, &ctx.disk)?;
        }
    }
    Ok(())
}

fn find_user(conn: &mut SqliteConnection, name: &str) -> failure::Fallible<User> {
    User::find_by_name(conn, name)?.ok_or_else(|| failure::format_err!("no user named {:?}", name))
}

fn print_json<T: Serialize>(value: &T) -> failure::Fallible<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
